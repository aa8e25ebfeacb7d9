//! Change events and the in-process event log.
//!
//! Every successful write can emit a [`ChangeEvent`]: create and update
//! carry the full record, delete carries only an id marker. Publishing is
//! best-effort by default — see
//! [`PublishFailurePolicy`](crate::config::PublishFailurePolicy).
//!
//! [`EventLog`] is the bounded, thread-safe consumer buffer: an append-only
//! ring with a fixed capacity that evicts its oldest entry when full, read
//! through an explicit [`snapshot`](EventLog::snapshot) accessor.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::customer::{Customer, CustomerId};
use crate::stores::traits::{EventPublisher, StoreError};

/// A change notification for a customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A new record was persisted (full record)
    Created(Customer),
    /// An existing record was replaced (full record)
    Updated(Customer),
    /// A record was removed (marker only, no record body)
    Deleted { id: CustomerId },
}

impl ChangeEvent {
    /// The id of the affected customer.
    #[must_use]
    pub fn customer_id(&self) -> CustomerId {
        match self {
            Self::Created(c) | Self::Updated(c) => c.id,
            Self::Deleted { id } => *id,
        }
    }
}

/// Bounded append-only buffer of consumed change events.
///
/// Holds at most `capacity` entries; appending to a full log evicts the
/// oldest entry first. Shared freely via `Arc`.
pub struct EventLog {
    entries: Mutex<VecDeque<ChangeEvent>>,
    capacity: usize,
}

impl EventLog {
    /// Create a log holding at most `capacity` events (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest entry if the log is full.
    pub fn append(&self, event: ChangeEvent) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    /// Copy of the current contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChangeEvent> {
        self.entries.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Publisher that appends into an in-process [`EventLog`].
///
/// Stands in for an external message-log consumer: what a broker would
/// deliver to a subscriber lands directly in the shared log.
pub struct LogPublisher {
    log: Arc<EventLog>,
}

impl LogPublisher {
    #[must_use]
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }

    /// The log this publisher appends to.
    #[must_use]
    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }
}

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        self.log.append(event.clone());
        crate::metrics::set_event_log_len(self.log.len());
        Ok(())
    }
}
