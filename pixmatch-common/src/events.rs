//! Event types for the pixmatch event system
//!
//! Provides shared event definitions and the EventBus used to fan scan
//! progress out to SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// pixmatch event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PixmatchEvent {
    /// Scan accepted and about to submit its first batch
    ScanStarted {
        scan_id: Uuid,
        /// Candidates in the scan
        total: usize,
        /// Number of external calls the scan will make
        batch_count: usize,
        batch_size: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One batch finished
    ///
    /// `processed` is cumulative and never decreases within a scan.
    ScanProgress {
        scan_id: Uuid,
        /// 1-based index of the batch that just completed
        batch_index: usize,
        processed: usize,
        total: usize,
        /// Rounded percentage (0-100)
        percentage: u8,
        /// Matches accumulated so far (before ranking)
        matches_so_far: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All batches succeeded and results are ranked
    ScanCompleted {
        scan_id: Uuid,
        total: usize,
        match_count: usize,
        elapsed_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A comparison call failed; remaining batches were skipped
    ScanFailed {
        scan_id: Uuid,
        processed: usize,
        total: usize,
        /// User-visible error message
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reference image replaced
    ReferenceChanged {
        image_id: Uuid,
        name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Candidate library replaced or cleared
    LibraryChanged {
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reference, library, results and status discarded
    WorkspaceReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PixmatchEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PixmatchEvent::ScanStarted { .. } => "ScanStarted",
            PixmatchEvent::ScanProgress { .. } => "ScanProgress",
            PixmatchEvent::ScanCompleted { .. } => "ScanCompleted",
            PixmatchEvent::ScanFailed { .. } => "ScanFailed",
            PixmatchEvent::ReferenceChanged { .. } => "ReferenceChanged",
            PixmatchEvent::LibraryChanged { .. } => "LibraryChanged",
            PixmatchEvent::WorkspaceReset { .. } => "WorkspaceReset",
        }
    }
}

/// Broadcast channel for [`PixmatchEvent`]s
///
/// Cloning an EventBus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PixmatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use pixmatch_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PixmatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PixmatchEvent,
    ) -> Result<usize, broadcast::error::SendError<PixmatchEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are fine to drop when no browser is connected.
    pub fn emit_lossy(&self, event: PixmatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
