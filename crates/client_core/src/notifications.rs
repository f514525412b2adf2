//! Renders the notification queue and expires each entry after a fixed dwell time.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use shared::domain::NotificationId;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ui::{Notification, UiStore};

pub struct NotificationSurface {
    ui: Arc<UiStore>,
    dwell: Duration,
    timers: Arc<Mutex<HashMap<NotificationId, JoinHandle<()>>>>,
}

impl NotificationSurface {
    pub fn new(ui: Arc<UiStore>, dwell: Duration) -> Self {
        Self {
            ui,
            dwell,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<NotificationId, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current queue, oldest first. Arms an expiry timer for each entry seen for the first time.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn render(&self) -> Vec<Notification> {
        let notifications = self.ui.notifications();
        let mut timers = self.timers();

        // Entries removed by some other path no longer need their timer.
        timers.retain(|id, handle| {
            let live = notifications.iter().any(|n| n.id == *id);
            if !live {
                handle.abort();
            }
            live && !handle.is_finished()
        });

        for notification in &notifications {
            if timers.contains_key(&notification.id) {
                continue;
            }
            let age = (Utc::now() - notification.timestamp)
                .to_std()
                .unwrap_or_default();
            let remaining = self.dwell.saturating_sub(age);
            timers.insert(notification.id, self.arm(notification.id, remaining));
        }

        notifications
    }

    fn arm(&self, id: NotificationId, remaining: Duration) -> JoinHandle<()> {
        let ui = Arc::clone(&self.ui);
        let timers = Arc::clone(&self.timers);
        // Deadline is fixed at arm time, not at the task's first poll.
        let deadline = tokio::time::Instant::now() + remaining;
        debug!(notification_id = id.0, remaining_ms = remaining.as_millis() as u64, "expiry armed");
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if ui.remove_notification(id) {
                debug!(notification_id = id.0, "notification expired");
            }
            timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
        })
    }

    /// Manual dismissal. Cancels the pending timer so it cannot fire late.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        if let Some(handle) = self.timers().remove(&id) {
            handle.abort();
        }
        self.ui.remove_notification(id)
    }

    pub fn armed_count(&self) -> usize {
        self.timers().len()
    }

    pub fn shutdown(&self) {
        for (_, handle) in self.timers().drain() {
            handle.abort();
        }
    }
}

impl Drop for NotificationSurface {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
