use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::domain::notification::{Notifier, Toast};

const MAX_TOASTS: usize = 100;

/// In-memory toast queue the view layer renders from. Keeps the newest 100.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    toasts: Mutex<VecDeque<Toast>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Toast>> {
        self.toasts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Toast> {
        self.lock().back().cloned()
    }

    pub fn dismiss(&self, id: &str) -> bool {
        let mut toasts = self.lock();
        let before = toasts.len();
        toasts.retain(|toast| toast.id != id);
        toasts.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, toast: Toast) {
        if toast.is_destructive() {
            warn!(title = %toast.title, description = %toast.description, "Toast");
        } else {
            info!(title = %toast.title, description = %toast.description, "Toast");
        }
        let mut toasts = self.lock();
        toasts.push_back(toast);
        while toasts.len() > MAX_TOASTS {
            toasts.pop_front();
        }
    }
}
