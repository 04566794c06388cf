//! ==============================================================================
//! store.rs - the latest-reading slot
//! ==============================================================================
//!
//! purpose:
//!     holds at most one StoredReading: the most recent accepted write.
//!     there is no history, no expiry and no eviction. the slot starts empty
//!     and only goes back to empty when the process restarts.
//!
//! concurrency:
//!     one parking_lot RwLock guards an Option<Arc<StoredReading>>.
//!     - write: the StoredReading is built before the lock is taken, then the
//!       pointer is swapped under the write guard
//!     - read: the Arc is cloned under the read guard
//!     a reader therefore sees either the old complete value or the new one,
//!     never a mix. nothing here awaits, so guards never cross a .await.
//!
//! relationships:
//!     - used by: api.rs (handlers receive it through AppState)
//!     - uses: domain.rs (Reading, StoredReading, StoreStatus)
//!
//! ==============================================================================

use crate::domain::{Reading, StoreStatus, StoredReading};
use parking_lot::RwLock;
use std::sync::Arc;

/// storage seam for the request handlers
///
/// production uses [`LatestReadingStore`]; tests can slot in anything else.
pub trait ReadingStore: Send + Sync {
    /// replace whatever is stored with a freshly stamped reading
    fn write(&self, reading: Reading, received_at_ms: u64, source_ip: Option<String>);

    /// snapshot of the current value, or None if nothing was ever written
    fn read_latest(&self) -> Option<Arc<StoredReading>>;

    fn status(&self) -> StoreStatus {
        match self.read_latest() {
            Some(stored) => StoreStatus {
                has_data: true,
                last_received_at_ms: Some(stored.received_at_ms),
            },
            None => StoreStatus::default(),
        }
    }
}

#[derive(Default)]
pub struct LatestReadingStore {
    slot: RwLock<Option<Arc<StoredReading>>>,
}

impl LatestReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadingStore for LatestReadingStore {
    fn write(&self, reading: Reading, received_at_ms: u64, source_ip: Option<String>) {
        let stored = Arc::new(StoredReading::new(reading, received_at_ms, source_ip));
        let previous = self.slot.write().replace(stored);
        // the old value is dropped here, outside the guard
        drop(previous);
    }

    fn read_latest(&self) -> Option<Arc<StoredReading>> {
        self.slot.read().clone()
    }

    fn status(&self) -> StoreStatus {
        let slot = self.slot.read();
        StoreStatus {
            has_data: slot.is_some(),
            last_received_at_ms: slot.as_ref().map(|s| s.received_at_ms),
        }
    }
}
