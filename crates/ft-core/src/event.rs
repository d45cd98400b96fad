//! Browser lifecycle notifications consumed by the tracker.

use serde::{Deserialize, Serialize};

use crate::types::{TabId, WindowId};

/// A tab or window lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BrowserEvent {
    /// A tab became the selected tab in its window.
    TabActivated { tab_id: TabId, window_id: WindowId },
    /// Window focus moved. [`WindowId::NONE`] means no browser window has focus.
    WindowFocusChanged { window_id: WindowId },
    /// A tab was closed.
    TabRemoved { tab_id: TabId },
    /// A tab's properties changed. `url` is present only when the URL did.
    TabUpdated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}
