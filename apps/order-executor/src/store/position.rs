//! Latest account snapshot.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::AccountSnapshot;

/// Holder of the most recent account snapshot.
///
/// Updates swap the whole snapshot; readers keep the `Arc` they got.
#[derive(Debug)]
pub struct PositionStore {
    current: RwLock<Arc<AccountSnapshot>>,
}

impl PositionStore {
    /// Create a store holding an empty snapshot for `account_id`.
    #[must_use]
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Arc::new(AccountSnapshot::empty(account_id))),
        }
    }

    /// Replace the current snapshot.
    pub fn update(&self, snapshot: AccountSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Current snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<AccountSnapshot> {
        Arc::clone(&self.current.read())
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new("")
    }
}
