//! Ordered trade event collections with range queries by time and signer

use super::normalizer::TradeEvent;
use std::collections::HashMap;

#[derive(Debug)]
pub enum IngestError {
    Io(std::io::Error),
    Database(rusqlite::Error),
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        IngestError::Database(err)
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "IO error: {}", e),
            IngestError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

/// Source of time-ordered trade events
///
/// All ranges are inclusive millisecond bounds; results are ordered by
/// `(timestamp_ms, slot)`.
pub trait EventStore {
    fn all_events(&self) -> Result<Vec<TradeEvent>, IngestError>;

    fn events_in_range(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TradeEvent>, IngestError>;

    fn events_by_signer(
        &self,
        signer: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TradeEvent>, IngestError>;

    fn count(&self) -> Result<usize, IngestError>;
}

/// Sorted in-memory store with a per-signer position index
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Vec<TradeEvent>,
    by_signer: HashMap<String, Vec<usize>>,
}

impl InMemoryEventStore {
    pub fn new(mut events: Vec<TradeEvent>) -> Self {
        events.sort_by_key(|t| (t.timestamp_ms, t.slot));

        let mut by_signer: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, event) in events.iter().enumerate() {
            by_signer.entry(event.signer.clone()).or_default().push(i);
        }

        Self { events, by_signer }
    }

    pub fn events(&self) -> &[TradeEvent] {
        &self.events
    }

    fn range_bounds(&self, start_ms: i64, end_ms: i64) -> (usize, usize) {
        let lo = self.events.partition_point(|t| t.timestamp_ms < start_ms);
        let hi = self.events.partition_point(|t| t.timestamp_ms <= end_ms);
        (lo, hi.max(lo))
    }
}

impl EventStore for InMemoryEventStore {
    fn all_events(&self) -> Result<Vec<TradeEvent>, IngestError> {
        Ok(self.events.clone())
    }

    fn events_in_range(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TradeEvent>, IngestError> {
        let (lo, hi) = self.range_bounds(start_ms, end_ms);
        Ok(self.events[lo..hi].to_vec())
    }

    fn events_by_signer(
        &self,
        signer: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TradeEvent>, IngestError> {
        let Some(positions) = self.by_signer.get(signer) else {
            return Ok(Vec::new());
        };

        Ok(positions
            .iter()
            .map(|&i| &self.events[i])
            .filter(|t| t.timestamp_ms >= start_ms && t.timestamp_ms <= end_ms)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, IngestError> {
        Ok(self.events.len())
    }
}
