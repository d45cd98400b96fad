//! A [`Browser`] backed by a mirror of tab state pushed from a browser bridge.
//!
//! When the tracker runs outside the browser, the extension side forwards
//! its tab and window notifications as [`HostMessage`]s. Each message is
//! applied to the mirror first, then the lifecycle ones are handed to the
//! tracker as [`BrowserEvent`]s, so lookups see the state the event describes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::browser::{Browser, BrowserError};
use crate::event::BrowserEvent;
use crate::types::{Tab, TabId, WindowId};

/// A message from the browser bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HostMessage {
    /// Full tab listing, typically sent once on connect.
    Snapshot {
        tabs: Vec<Tab>,
        #[serde(default)]
        focused_window_id: Option<WindowId>,
    },
    TabCreated {
        tab: Tab,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    WindowFocusChanged {
        window_id: WindowId,
    },
    TabRemoved {
        tab_id: TabId,
    },
    TabUpdated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

#[derive(Debug, Default)]
struct MirrorState {
    tabs: BTreeMap<TabId, Tab>,
    focused: Option<WindowId>,
}

impl MirrorState {
    fn select(&mut self, tab_id: TabId, window_id: WindowId) {
        for tab in self.tabs.values_mut().filter(|t| t.window_id == window_id) {
            tab.active = tab.id == tab_id;
        }
    }
}

/// Shared mirror of the browser's tabs. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct TabMirror {
    state: Arc<Mutex<MirrorState>>,
}

impl TabMirror {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MirrorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of tabs currently mirrored.
    pub fn len(&self) -> usize {
        self.lock().tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tabs.is_empty()
    }

    /// Applies a bridge message, returning the event the tracker should see.
    pub fn apply(&self, message: HostMessage) -> Option<BrowserEvent> {
        let mut state = self.lock();
        match message {
            HostMessage::Snapshot {
                tabs,
                focused_window_id,
            } => {
                state.tabs = tabs.into_iter().map(|t| (t.id, t)).collect();
                state.focused = focused_window_id.filter(|w| !w.is_unfocused());
                tracing::debug!(tabs = state.tabs.len(), "applied tab snapshot");
                None
            }
            HostMessage::TabCreated { tab } => {
                let (id, window_id, active) = (tab.id, tab.window_id, tab.active);
                state.tabs.insert(id, tab);
                if active {
                    state.select(id, window_id);
                }
                None
            }
            HostMessage::TabActivated { tab_id, window_id } => {
                state.select(tab_id, window_id);
                Some(BrowserEvent::TabActivated { tab_id, window_id })
            }
            HostMessage::WindowFocusChanged { window_id } => {
                state.focused = (!window_id.is_unfocused()).then_some(window_id);
                Some(BrowserEvent::WindowFocusChanged { window_id })
            }
            HostMessage::TabRemoved { tab_id } => {
                state.tabs.remove(&tab_id);
                Some(BrowserEvent::TabRemoved { tab_id })
            }
            HostMessage::TabUpdated { tab_id, url } => {
                if let (Some(tab), Some(url)) = (state.tabs.get_mut(&tab_id), url.as_ref()) {
                    tab.url.clone_from(url);
                }
                Some(BrowserEvent::TabUpdated { tab_id, url })
            }
        }
    }
}

impl Browser for TabMirror {
    async fn get_tab(&self, tab_id: TabId) -> Result<Tab, BrowserError> {
        self.lock()
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or(BrowserError::TabNotFound(tab_id))
    }

    async fn active_tab(&self, window_id: WindowId) -> Result<Option<Tab>, BrowserError> {
        Ok(self
            .lock()
            .tabs
            .values()
            .find(|t| t.window_id == window_id && t.active)
            .cloned())
    }

    async fn focused_active_tab(&self) -> Result<Option<Tab>, BrowserError> {
        let focused = self.lock().focused;
        match focused {
            Some(window_id) => self.active_tab(window_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: i64, window: i64, url: &str, active: bool) -> Tab {
        Tab {
            id: TabId::new(id),
            window_id: WindowId::new(window),
            url: url.to_string(),
            active,
        }
    }

    #[test]
    fn parses_bridge_messages() {
        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"snapshot","tabs":[{"id":1,"windowId":2,"url":"https://a.com/","active":true}],"focusedWindowId":2}"#,
        )
        .unwrap();
        assert!(matches!(msg, HostMessage::Snapshot { ref tabs, focused_window_id: Some(_) } if tabs.len() == 1));

        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"tab_updated","tabId":1,"url":"https://b.com/"}"#)
                .unwrap();
        assert_eq!(
            msg,
            HostMessage::TabUpdated {
                tab_id: TabId::new(1),
                url: Some("https://b.com/".to_string())
            }
        );
    }

    #[tokio::test]
    async fn snapshot_sets_focused_active_tab() {
        let mirror = TabMirror::new();
        let event = mirror.apply(HostMessage::Snapshot {
            tabs: vec![tab(1, 1, "https://a.com/", true), tab(2, 2, "https://b.com/", true)],
            focused_window_id: Some(WindowId::new(2)),
        });
        assert!(event.is_none());
        assert_eq!(mirror.len(), 2);

        let focused = mirror.focused_active_tab().await.unwrap().unwrap();
        assert_eq!(focused.id, TabId::new(2));
    }

    #[tokio::test]
    async fn activation_moves_selection_within_window() {
        let mirror = TabMirror::new();
        mirror.apply(HostMessage::TabCreated {
            tab: tab(1, 1, "https://a.com/", true),
        });
        mirror.apply(HostMessage::TabCreated {
            tab: tab(2, 1, "https://b.com/", false),
        });

        let event = mirror.apply(HostMessage::TabActivated {
            tab_id: TabId::new(2),
            window_id: WindowId::new(1),
        });
        assert!(matches!(event, Some(BrowserEvent::TabActivated { .. })));

        let active = mirror.active_tab(WindowId::new(1)).await.unwrap().unwrap();
        assert_eq!(active.id, TabId::new(2));
        assert!(!mirror.get_tab(TabId::new(1)).await.unwrap().active);
    }

    #[tokio::test]
    async fn unfocus_clears_focused_window() {
        let mirror = TabMirror::new();
        mirror.apply(HostMessage::Snapshot {
            tabs: vec![tab(1, 1, "https://a.com/", true)],
            focused_window_id: Some(WindowId::new(1)),
        });
        mirror.apply(HostMessage::WindowFocusChanged {
            window_id: WindowId::NONE,
        });
        assert!(mirror.focused_active_tab().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removed_tab_lookup_fails() {
        let mirror = TabMirror::new();
        mirror.apply(HostMessage::TabCreated {
            tab: tab(1, 1, "https://a.com/", true),
        });
        mirror.apply(HostMessage::TabRemoved {
            tab_id: TabId::new(1),
        });
        assert!(mirror.is_empty());
        assert_eq!(
            mirror.get_tab(TabId::new(1)).await,
            Err(BrowserError::TabNotFound(TabId::new(1)))
        );
    }

    #[tokio::test]
    async fn update_rewrites_url() {
        let mirror = TabMirror::new();
        mirror.apply(HostMessage::TabCreated {
            tab: tab(1, 1, "https://a.com/", true),
        });
        mirror.apply(HostMessage::TabUpdated {
            tab_id: TabId::new(1),
            url: Some("https://a.com/next".to_string()),
        });
        assert_eq!(
            mirror.get_tab(TabId::new(1)).await.unwrap().url,
            "https://a.com/next"
        );
    }
}
