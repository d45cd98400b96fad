//! Core domain logic for the tab focus tracker.
//!
//! This crate contains:
//! - The tracker state machine that turns browser events into focus sessions
//! - The browser, sink and clock seams the tracker runs against
//! - A serialized event driver and a tab mirror for bridged browsers

pub mod browser;
pub mod clock;
mod domain;
pub mod driver;
pub mod event;
pub mod mirror;
mod report;
pub mod sink;
pub mod tracker;
mod types;

pub use browser::{Browser, BrowserError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::extract_domain;
pub use event::BrowserEvent;
pub use mirror::{HostMessage, TabMirror};
pub use report::{MAX_SESSION_MS, ReportTarget, SessionReport};
pub use sink::{RecordingSink, ReportSink};
pub use tracker::{ActiveSession, Tracker, TrackerState};
pub use types::{Tab, TabId, TrackingMode, ValidationError, WindowId};
