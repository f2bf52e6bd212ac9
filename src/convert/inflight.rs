// Per-identifier conversion exclusion.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Set of identifiers with a conversion currently running.
#[derive(Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`, or `None` if another conversion already holds it.
    pub fn try_acquire(&self, id: &str) -> Option<InFlightGuard> {
        let mut active = self.active.lock();
        if !active.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            id: id.to_string(),
        })
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the identifier when dropped.
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}
