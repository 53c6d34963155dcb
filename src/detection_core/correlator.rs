//! Oracle-burst correlation by slot for the timing signal of the classifier

use super::normalizer::TradeEvent;
use std::collections::BTreeSet;

/// Slots in which the oracle-analysis collaborator flagged a price-feed burst
#[derive(Debug, Clone, Default)]
pub struct OracleBurstIndex {
    burst_slots: BTreeSet<u64>,
}

impl OracleBurstIndex {
    pub fn from_slots(slots: impl IntoIterator<Item = u64>) -> Self {
        Self {
            burst_slots: slots.into_iter().collect(),
        }
    }

    /// Build the index from the per-record `oracle_burst_in_window` column
    ///
    /// Returns `None` when no record carries the column, meaning the signal
    /// was not supplied at all (as opposed to supplied and all false).
    pub fn from_events(events: &[TradeEvent]) -> Option<Self> {
        let mut supplied = false;
        let mut burst_slots = BTreeSet::new();

        for event in events {
            match event.oracle_burst_in_window {
                Some(true) => {
                    supplied = true;
                    burst_slots.insert(event.slot);
                }
                Some(false) => supplied = true,
                None => {}
            }
        }

        supplied.then_some(Self { burst_slots })
    }

    pub fn len(&self) -> usize {
        self.burst_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.burst_slots.is_empty()
    }

    /// Whether any burst falls inside the inclusive slot range
    pub fn correlates(&self, start_slot: u64, end_slot: u64) -> bool {
        if start_slot > end_slot {
            return false;
        }
        self.burst_slots.range(start_slot..=end_slot).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_trade(slot: u64, burst: Option<bool>) -> TradeEvent {
        let mut t = TradeEvent::new("a", slot as i64 * 400, slot, "P1", "WSOL", "PUMP");
        t.oracle_burst_in_window = burst;
        t
    }

    #[test]
    fn test_range_hit() {
        let index = OracleBurstIndex::from_slots([100, 205]);

        assert!(index.correlates(98, 100));
        assert!(index.correlates(200, 210));
        assert!(!index.correlates(101, 204));
    }

    #[test]
    fn test_inverted_range() {
        let index = OracleBurstIndex::from_slots([100]);
        assert!(!index.correlates(101, 99));
    }

    #[test]
    fn test_not_supplied() {
        let events = vec![create_test_trade(1, None), create_test_trade(2, None)];
        assert!(OracleBurstIndex::from_events(&events).is_none());
    }

    #[test]
    fn test_supplied_from_column() {
        let events = vec![
            create_test_trade(1, Some(false)),
            create_test_trade(2, Some(true)),
            create_test_trade(3, None),
        ];

        let index = OracleBurstIndex::from_events(&events).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.correlates(2, 2));
        assert!(!index.correlates(3, 9));
    }

    #[test]
    fn test_supplied_all_false() {
        let events = vec![create_test_trade(1, Some(false))];
        let index = OracleBurstIndex::from_events(&events).unwrap();
        assert!(index.is_empty());
    }
}
