//! # Harvest Events
//!
//! This module provides a broadcast channel system for emitting progress,
//! throttling and retry events that consumers can listen to and react to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the [`Harvester`](crate::Harvester) while it works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HarvestEvent {
    /// A failed operation is about to be retried.
    RetryStarting {
        /// The timestamp when the retry was scheduled
        timestamp: DateTime<Utc>,
        /// Name of the operation being retried
        operation: String,
        /// The delay in seconds before this retry
        delay_seconds: u64,
        /// The retry number (1-based)
        attempt: u32,
        /// Maximum number of retries
        max_attempts: u32,
    },
    /// An operation succeeded after at least one retry.
    RetrySucceeded {
        /// The timestamp when the retry succeeded
        timestamp: DateTime<Utc>,
        /// Name of the operation
        operation: String,
        /// The retry number that succeeded (1-based)
        attempt: u32,
        /// Total backoff time in seconds across all retries
        total_delay: u64,
    },
    /// An operation exhausted its retry budget.
    RetriesExhausted {
        /// The timestamp when retries were exhausted
        timestamp: DateTime<Utc>,
        /// Name of the operation
        operation: String,
        /// Total number of attempts made
        attempts: u32,
    },
    /// A randomized pause was inserted before a lyrics fetch.
    Throttled {
        /// The timestamp when the pause started
        timestamp: DateTime<Utc>,
        /// Length of the pause in milliseconds
        delay_millis: u64,
    },
    /// A song's lyrics and songwriters were written to the catalog.
    SongHarvested {
        /// The timestamp when the song was written
        timestamp: DateTime<Utc>,
        /// Catalog key of the song
        song: String,
        /// Number of songs written so far in this batch
        completed: usize,
        /// Number of songs in the batch
        total: usize,
    },
}

/// A handle for receiving harvest events.
pub type HarvestEventReceiver = broadcast::Receiver<HarvestEvent>;

/// A handle for sending harvest events.
pub type HarvestEventSender = broadcast::Sender<HarvestEvent>;

/// Creates a new broadcast channel for harvest events.
///
/// The channel has a capacity of 100 events; slow receivers observe
/// `RecvError::Lagged` rather than blocking the harvester.
pub fn create_event_channel() -> (HarvestEventSender, HarvestEventReceiver) {
    broadcast::channel(100)
}

/// Helper trait for emitting harvest events.
pub trait HarvestEventEmitter {
    fn emit_retry_starting(&self, operation: &str, delay_seconds: u64, attempt: u32, max_attempts: u32);

    fn emit_retry_succeeded(&self, operation: &str, attempt: u32, total_delay: u64);

    fn emit_retries_exhausted(&self, operation: &str, attempts: u32);

    fn emit_throttled(&self, delay_millis: u64);

    fn emit_song_harvested(&self, song: &str, completed: usize, total: usize);
}

impl HarvestEventEmitter for HarvestEventSender {
    fn emit_retry_starting(&self, operation: &str, delay_seconds: u64, attempt: u32, max_attempts: u32) {
        let _ = self.send(HarvestEvent::RetryStarting {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            delay_seconds,
            attempt,
            max_attempts,
        }); // Ignore send errors (no receivers)
    }

    fn emit_retry_succeeded(&self, operation: &str, attempt: u32, total_delay: u64) {
        let _ = self.send(HarvestEvent::RetrySucceeded {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            attempt,
            total_delay,
        });
    }

    fn emit_retries_exhausted(&self, operation: &str, attempts: u32) {
        let _ = self.send(HarvestEvent::RetriesExhausted {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            attempts,
        });
    }

    fn emit_throttled(&self, delay_millis: u64) {
        let _ = self.send(HarvestEvent::Throttled {
            timestamp: Utc::now(),
            delay_millis,
        });
    }

    fn emit_song_harvested(&self, song: &str, completed: usize, total: usize) {
        let _ = self.send(HarvestEvent::SongHarvested {
            timestamp: Utc::now(),
            song: song.to_string(),
            completed,
            total,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_receivers_does_not_fail() {
        let (sender, receiver) = create_event_channel();
        drop(receiver);
        sender.emit_throttled(1500);
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let (sender, mut receiver) = create_event_channel();
        sender.emit_song_harvested("Heroes", 2, 3);

        match receiver.recv().await.unwrap() {
            HarvestEvent::SongHarvested {
                song,
                completed,
                total,
                ..
            } => {
                assert_eq!(song, "Heroes");
                assert_eq!((completed, total), (2, 3));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
