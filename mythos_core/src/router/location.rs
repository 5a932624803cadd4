//! Location fragment holder
//!
//! Stands in for the host environment's address bar: the router reads the
//! current fragment from it, writes new fragments through it, and reacts to
//! its change notifications.

use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const CHANGE_CAPACITY: usize = 64;

/// Current location fragment with change notification
pub trait Location: Send + Sync {
    /// Current fragment including the `#` marker, or empty
    fn fragment(&self) -> String;

    /// Move to `fragment`; notifies subscribers when it differs from the
    /// current one
    fn set_fragment(&self, fragment: &str);

    /// Return to the previous fragment; `false` when there is none
    fn back(&self) -> bool;

    /// Receiver of every subsequent fragment change
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

struct Inner {
    current: String,
    previous: Vec<String>,
}

/// In-process [`Location`] with its own back stack
pub struct MemoryLocation {
    inner: Mutex<Inner>,
    changes: broadcast::Sender<String>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::starting_at("")
    }

    pub fn starting_at(fragment: &str) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                current: fragment.to_string(),
                previous: Vec::new(),
            }),
            changes,
        }
    }

    fn notify(&self, fragment: String) {
        // No subscribers is fine
        let _ = self.changes.send(fragment);
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn set_fragment(&self, fragment: &str) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.current == fragment {
                return;
            }
            let old = std::mem::replace(&mut inner.current, fragment.to_string());
            inner.previous.push(old);
        }
        self.notify(fragment.to_string());
    }

    fn back(&self) -> bool {
        let fragment = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(previous) = inner.previous.pop() else {
                return false;
            };
            inner.current = previous.clone();
            previous
        };
        self.notify(fragment);
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_back() {
        let location = MemoryLocation::new();
        location.set_fragment("#/mythology/greek");
        location.set_fragment("#/search");
        assert_eq!(location.fragment(), "#/search");

        assert!(location.back());
        assert_eq!(location.fragment(), "#/mythology/greek");
        assert!(location.back());
        assert_eq!(location.fragment(), "");
        assert!(!location.back());
    }

    #[tokio::test]
    async fn test_change_notifications() {
        let location = MemoryLocation::new();
        let mut changes = location.subscribe();

        location.set_fragment("#/search");
        // Same fragment: no event
        location.set_fragment("#/search");
        location.back();

        assert_eq!(changes.recv().await.unwrap(), "#/search");
        assert_eq!(changes.recv().await.unwrap(), "");
        assert!(changes.try_recv().is_err());
    }
}
