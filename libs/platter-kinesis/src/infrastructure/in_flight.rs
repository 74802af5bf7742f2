//! Bookkeeping for records the adapter has accepted but not resolved

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Start times of in-flight `PutRecord` calls, keyed by ticket
///
/// Tickets are handed out in increasing order, so the first entry is always
/// the oldest call.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlightTable {
    entries: Arc<Mutex<BTreeMap<u64, Instant>>>,
}

impl InFlightTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, ticket: u64, started: Instant) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "in-flight table lock poisoned".to_string())?;
        entries.insert(ticket, started);
        Ok(())
    }

    pub(crate) fn remove(&self, ticket: u64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&ticket);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Age of the oldest entry as of `now`
    pub(crate) fn oldest_age(&self, now: Instant) -> Result<Option<Duration>, String> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| "in-flight table lock poisoned".to_string())?;
        Ok(entries
            .first_key_value()
            .map(|(_, started)| now.saturating_duration_since(*started)))
    }
}
