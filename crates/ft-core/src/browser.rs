//! The tab/window API the tracker consumes.

use thiserror::Error;

use crate::types::{Tab, TabId, WindowId};

/// Tab lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// The tab closed between the event firing and the lookup.
    #[error("no tab with id {0}")]
    TabNotFound(TabId),
    /// The browser refused or failed the call.
    #[error("browser API error: {0}")]
    Api(String),
}

/// Host-provided tab and window queries.
///
/// All calls may fail; the tracker logs failures and never retries.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Looks up a tab by id.
    async fn get_tab(&self, tab_id: TabId) -> Result<Tab, BrowserError>;

    /// Returns the selected tab of `window_id`, if the window has one.
    async fn active_tab(&self, window_id: WindowId) -> Result<Option<Tab>, BrowserError>;

    /// Returns the selected tab of the currently focused window.
    async fn focused_active_tab(&self) -> Result<Option<Tab>, BrowserError>;
}
