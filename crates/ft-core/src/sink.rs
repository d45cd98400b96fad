//! Destinations for completed session reports.

use std::sync::{Arc, Mutex, PoisonError};

use crate::report::SessionReport;

/// Accepts finished sessions.
///
/// Submission is fire-and-forget: implementations must not block the caller
/// and must swallow (and log) their own delivery failures.
pub trait ReportSink {
    fn submit(&self, report: SessionReport);
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn submit(&self, report: SessionReport) {
        (**self).submit(report);
    }
}

/// Keeps every submitted report in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<SessionReport>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reports submitted so far, oldest first.
    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for RecordingSink {
    fn submit(&self, report: SessionReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}
