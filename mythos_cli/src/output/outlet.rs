use mythos_core::Outlet;
use std::sync::{Mutex, PoisonError};

/// Outlet that keeps the most recently mounted markup for printing
#[derive(Debug, Default)]
pub struct BufferedOutlet {
    current: Mutex<Option<String>>,
}

impl BufferedOutlet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the mounted markup, leaving the outlet empty
    pub fn take(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Outlet for BufferedOutlet {
    fn mount(&self, markup: String) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(markup);
    }
}
