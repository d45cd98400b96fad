//! The focus tracker state machine.
//!
//! The tracker holds at most one [`ActiveSession`]: the tab the user is
//! looking at and when they started looking at it. Every transition that
//! ends a session submits exactly one [`SessionReport`] to the sink before
//! the next session begins.
//!
//! # States
//!
//! - [`TrackerState::Idle`]: no session. Initial state.
//! - [`TrackerState::Tracking`]: a session is in progress.
//!
//! Switching tabs, closing the tracked tab, navigating to another domain and
//! losing window focus all close the current session. Only the first three
//! can immediately open another; losing focus leaves the tracker idle until
//! the next activation.

use crate::browser::Browser;
use crate::clock::Clock;
use crate::domain::extract_domain;
use crate::event::BrowserEvent;
use crate::report::{ReportTarget, SessionReport};
use crate::sink::ReportSink;
use crate::types::{Tab, TabId, TrackingMode, WindowId};

/// The tab currently holding the user's focus.
///
/// The tab and its start time live in one value so they can only be set or
/// cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub tab: Tab,
    /// When the session began, epoch milliseconds.
    pub started_at: i64,
}

/// Whether a session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
}

/// Tracks which tab is focused and reports each completed focus session.
pub struct Tracker<B, S, C> {
    browser: B,
    sink: S,
    clock: C,
    mode: TrackingMode,
    session: Option<ActiveSession>,
}

impl<B, S, C> Tracker<B, S, C>
where
    B: Browser,
    S: ReportSink,
    C: Clock,
{
    /// Creates an idle tracker.
    pub const fn new(browser: B, sink: S, clock: C, mode: TrackingMode) -> Self {
        Self {
            browser,
            sink,
            clock,
            mode,
            session: None,
        }
    }

    pub const fn state(&self) -> TrackerState {
        if self.session.is_some() {
            TrackerState::Tracking
        } else {
            TrackerState::Idle
        }
    }

    pub const fn active_session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub const fn browser(&self) -> &B {
        &self.browser
    }

    /// Picks up the tab already focused when the tracker starts.
    ///
    /// No report is emitted since there is no earlier session to close.
    pub async fn initialize(&mut self) {
        match self.browser.focused_active_tab().await {
            Ok(Some(tab)) => {
                let started_at = self.clock.now_ms();
                tracing::debug!(tab_id = %tab.id, url = %tab.url, "tracking initial tab");
                self.session = Some(ActiveSession { tab, started_at });
            }
            Ok(None) => tracing::debug!("no focused tab at startup"),
            Err(err) => tracing::warn!(error = %err, "failed to query the initial active tab"),
        }
    }

    /// Dispatches one browser notification.
    pub async fn handle(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabActivated { tab_id, window_id } => {
                self.activate(tab_id, window_id).await;
            }
            BrowserEvent::WindowFocusChanged { window_id } => {
                self.window_focus_changed(window_id).await;
            }
            BrowserEvent::TabRemoved { tab_id } => self.tab_removed(tab_id),
            BrowserEvent::TabUpdated { tab_id, url } => self.tab_updated(tab_id, url.as_deref()),
        }
    }

    /// A tab became the selected tab of `window_id`.
    pub async fn activate(&mut self, tab_id: TabId, window_id: WindowId) {
        tracing::trace!(%tab_id, %window_id, "tab activated");
        self.end_session();
        self.begin_session(tab_id).await;
    }

    /// Window focus moved to `window_id`, or away from the browser entirely.
    pub async fn window_focus_changed(&mut self, window_id: WindowId) {
        if window_id.is_unfocused() {
            tracing::trace!("browser lost focus");
            self.end_session();
            return;
        }

        match self.browser.active_tab(window_id).await {
            Ok(Some(tab)) => self.activate(tab.id, window_id).await,
            Ok(None) => tracing::debug!(%window_id, "focused window has no active tab"),
            Err(err) => {
                tracing::warn!(%window_id, error = %err, "failed to query the window's active tab");
            }
        }
    }

    /// A tab closed. Ends the session if it was the tracked tab.
    pub fn tab_removed(&mut self, tab_id: TabId) {
        if self.is_tracking(tab_id) {
            self.end_session();
        }
    }

    /// A tab's URL may have changed.
    ///
    /// Only domain mode follows navigation: a new path on the same host keeps
    /// the session running, a new host closes it and opens the next one at
    /// the same instant.
    pub fn tab_updated(&mut self, tab_id: TabId, url: Option<&str>) {
        let Some(new_url) = url else {
            return;
        };
        if self.mode != TrackingMode::Domain || !self.is_tracking(tab_id) {
            return;
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let old_domain = extract_domain(&session.tab.url);
        let new_domain = extract_domain(new_url);
        if old_domain == new_domain {
            session.tab.url = new_url.to_string();
            return;
        }

        let report = SessionReport::new(
            session.tab.id,
            ReportTarget::Domain(old_domain),
            session.started_at,
            now,
        );
        tracing::debug!(%tab_id, from = %report.target.as_str(), to = %new_domain, "domain changed");
        session.tab.url = new_url.to_string();
        session.started_at = report.close_time;
        self.sink.submit(report);
    }

    /// Closes the current session, if any, and reports it.
    pub fn end_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let report = SessionReport::new(
            session.tab.id,
            ReportTarget::for_mode(self.mode, &session.tab.url),
            session.started_at,
            self.clock.now_ms(),
        );
        tracing::debug!(
            tab_id = %report.tab_id,
            target = %report.target.as_str(),
            duration_ms = report.active_duration,
            "session ended"
        );
        self.sink.submit(report);
    }

    async fn begin_session(&mut self, tab_id: TabId) {
        match self.browser.get_tab(tab_id).await {
            Ok(tab) => {
                let started_at = self.clock.now_ms();
                tracing::debug!(tab_id = %tab.id, url = %tab.url, "session started");
                self.session = Some(ActiveSession { tab, started_at });
            }
            Err(err) => tracing::warn!(%tab_id, error = %err, "failed to get tab information"),
        }
    }

    fn is_tracking(&self, tab_id: TabId) -> bool {
        self.session.as_ref().is_some_and(|s| s.tab.id == tab_id)
    }
}
