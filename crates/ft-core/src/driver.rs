//! Serialized event loop around a [`Tracker`].
//!
//! Inputs are handled strictly one at a time: a handler's tab lookups finish
//! before the next input is taken off the queue, so a slow lookup can never
//! overwrite state produced by a later event.

use tokio::sync::mpsc;

use crate::browser::Browser;
use crate::clock::Clock;
use crate::event::BrowserEvent;
use crate::mirror::{HostMessage, TabMirror};
use crate::sink::ReportSink;
use crate::tracker::Tracker;

/// Something that can be queued for the tracker.
///
/// Resolution happens on the driver, immediately before the tracker handles
/// the resulting event, so browser state and events stay in step.
pub trait Inbound<B> {
    /// Turns the input into a tracker event, updating `browser` if needed.
    fn resolve(self, browser: &B) -> Option<BrowserEvent>;
}

impl<B> Inbound<B> for BrowserEvent {
    fn resolve(self, _browser: &B) -> Option<BrowserEvent> {
        Some(self)
    }
}

impl Inbound<TabMirror> for HostMessage {
    fn resolve(self, mirror: &TabMirror) -> Option<BrowserEvent> {
        mirror.apply(self)
    }
}

/// Sending half of the tracker's queue.
pub type EventSender<M = BrowserEvent> = mpsc::UnboundedSender<M>;

/// Receiving half of the tracker's queue.
pub type EventReceiver<M = BrowserEvent> = mpsc::UnboundedReceiver<M>;

/// Creates the queue feeding [`run`].
pub fn channel<M>() -> (EventSender<M>, EventReceiver<M>) {
    mpsc::unbounded_channel()
}

/// Initializes the tracker, then feeds it inputs until every sender is dropped.
///
/// When the queue closes the browser is gone, so any session still open is
/// ended and reported. The tracker is handed back for inspection.
pub async fn run<B, S, C, M>(
    mut tracker: Tracker<B, S, C>,
    mut inputs: EventReceiver<M>,
) -> Tracker<B, S, C>
where
    B: Browser,
    S: ReportSink,
    C: Clock,
    M: Inbound<B>,
{
    tracker.initialize().await;

    let mut handled = 0_u64;
    while let Some(input) = inputs.recv().await {
        if let Some(event) = input.resolve(tracker.browser()) {
            tracker.handle(event).await;
            handled += 1;
        }
    }

    tracing::debug!(handled, "event queue closed");
    tracker.end_session();
    tracker
}
