//! Transient UI chrome shared by otherwise unrelated views.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{NotificationId, NotificationKind, Theme};
use tokio::sync::broadcast;
use tracing::debug;

pub const DEFAULT_ACTIVE_VIEW: &str = "dashboard";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalContent {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ModalContent {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub active_view: String,
    pub sidebar_open: bool,
    /// Present exactly while a modal is open.
    pub modal: Option<ModalContent>,
    pub notifications: Vec<Notification>,
    pub theme: Theme,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_view: DEFAULT_ACTIVE_VIEW.to_string(),
            sidebar_open: true,
            modal: None,
            notifications: Vec::new(),
            theme: Theme::default(),
        }
    }
}

impl UiState {
    pub fn modal_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ActiveViewChanged(String),
    SidebarChanged(bool),
    ModalOpened { key: String },
    ModalClosed,
    NotificationAdded(NotificationId),
    NotificationRemoved(NotificationId),
    NotificationsCleared,
    ThemeChanged(Theme),
}

struct UiInner {
    state: UiState,
    last_notification_id: u64,
}

pub struct UiStore {
    inner: Mutex<UiInner>,
    events: broadcast::Sender<UiEvent>,
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UiStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Mutex::new(UiInner {
                state: UiState::default(),
                last_notification_id: 0,
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, UiInner> {
        // Every mutation leaves the state consistent, so a poisoned guard is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> UiState {
        self.lock().state.clone()
    }

    pub fn active_view(&self) -> String {
        self.lock().state.active_view.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().state.notifications.clone()
    }

    pub fn contains_notification(&self, id: NotificationId) -> bool {
        self.lock().state.notifications.iter().any(|n| n.id == id)
    }

    /// No validation; unknown ids are the router's problem.
    pub fn set_active_view(&self, id: impl Into<String>) {
        let id = id.into();
        self.lock().state.active_view = id.clone();
        debug!(view = %id, "active view changed");
        self.emit(UiEvent::ActiveViewChanged(id));
    }

    pub fn toggle_sidebar(&self) -> bool {
        let open = {
            let mut inner = self.lock();
            inner.state.sidebar_open = !inner.state.sidebar_open;
            inner.state.sidebar_open
        };
        self.emit(UiEvent::SidebarChanged(open));
        open
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.lock().state.sidebar_open = open;
        self.emit(UiEvent::SidebarChanged(open));
    }

    /// Replaces whatever modal is showing; there is never more than one.
    pub fn open_modal(&self, content: ModalContent) {
        let key = content.key.clone();
        let replaced = self.lock().state.modal.replace(content);
        if let Some(previous) = replaced {
            debug!(previous = %previous.key, next = %key, "modal replaced");
        }
        self.emit(UiEvent::ModalOpened { key });
    }

    pub fn close_modal(&self) {
        let closed = self.lock().state.modal.take();
        if closed.is_some() {
            self.emit(UiEvent::ModalClosed);
        }
    }

    pub fn add_notification(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> NotificationId {
        let timestamp = Utc::now();
        let id = {
            let mut inner = self.lock();
            // Creation-time ids, bumped past the previous one when two land in the same millisecond.
            let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or_default();
            let id = millis.max(inner.last_notification_id + 1);
            inner.last_notification_id = id;
            let id = NotificationId(id);
            inner.state.notifications.push(Notification {
                id,
                kind,
                message: message.into(),
                timestamp,
                read: false,
            });
            id
        };
        debug!(notification_id = id.0, kind = kind.as_str(), "notification added");
        self.emit(UiEvent::NotificationAdded(id));
        id
    }

    /// Returns `false` when the id was already gone.
    pub fn remove_notification(&self, id: NotificationId) -> bool {
        let removed = {
            let mut inner = self.lock();
            let before = inner.state.notifications.len();
            inner.state.notifications.retain(|n| n.id != id);
            inner.state.notifications.len() != before
        };
        if removed {
            debug!(notification_id = id.0, "notification removed");
            self.emit(UiEvent::NotificationRemoved(id));
        }
        removed
    }

    pub fn mark_notification_read(&self, id: NotificationId) -> bool {
        let mut inner = self.lock();
        match inner.state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_notifications(&self) {
        let had_any = {
            let mut inner = self.lock();
            let had_any = !inner.state.notifications.is_empty();
            inner.state.notifications.clear();
            had_any
        };
        if had_any {
            self.emit(UiEvent::NotificationsCleared);
        }
    }

    pub fn theme(&self) -> Theme {
        self.lock().state.theme
    }

    pub fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut inner = self.lock();
            inner.state.theme = inner.state.theme.toggled();
            inner.state.theme
        };
        self.emit(UiEvent::ThemeChanged(theme));
        theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.lock().state.theme = theme;
        self.emit(UiEvent::ThemeChanged(theme));
    }
}

#[cfg(test)]
#[path = "tests/ui_tests.rs"]
mod tests;
