//! Per-instrument lifecycle store.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::InstrumentState;

/// Instrument id to lifecycle state.
///
/// One coarse lock guards the whole map. `get` followed by `update` is not
/// atomic: two writers racing on the same instrument resolve last-write-wins.
/// Entries are created on first write and never removed.
#[derive(Debug, Default)]
pub struct InstrumentStateStore {
    states: Mutex<HashMap<String, InstrumentState>>,
}

impl InstrumentStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the state of `instrument_id`.
    pub fn update(&self, instrument_id: &str, state: InstrumentState) {
        self.states.lock().insert(instrument_id.to_string(), state);
    }

    /// Current state of `instrument_id`, if ever written.
    #[must_use]
    pub fn get(&self, instrument_id: &str) -> Option<InstrumentState> {
        self.states.lock().get(instrument_id).cloned()
    }

    /// Copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, InstrumentState> {
        self.states.lock().clone()
    }

    /// Number of tracked instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}
