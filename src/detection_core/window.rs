//! Multi-granularity sliding window scan over time-ordered trade events

use super::normalizer::TradeEvent;

/// Window granularity in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowSize(u64);

impl WindowSize {
    pub fn from_millis(ms: u64) -> Self {
        WindowSize(ms)
    }

    /// Saturates instead of wrapping for absurdly large inputs
    pub fn from_secs(secs: u64) -> Self {
        WindowSize(secs.saturating_mul(1_000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Width as a timestamp delta, clamped to `i64::MAX`
    pub fn as_span_ms(&self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    /// Label used for file names and reports, e.g. "2s" or "500ms"
    pub fn as_label(&self) -> String {
        if self.0 % 1_000 == 0 {
            format!("{}s", self.0 / 1_000)
        } else {
            format!("{}ms", self.0)
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        if let Some(ms) = s.strip_suffix("ms") {
            return ms.parse().ok().map(WindowSize);
        }
        s.strip_suffix('s')
            .and_then(|secs| secs.parse().ok())
            .map(WindowSize::from_secs)
    }

    /// Default scan granularities: 1s, 2s, 5s, 10s
    pub fn defaults() -> [WindowSize; 4] {
        [
            WindowSize::from_secs(1),
            WindowSize::from_secs(2),
            WindowSize::from_secs(5),
            WindowSize::from_secs(10),
        ]
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_label())
    }
}

/// Contiguous run of trades captured by one window
#[derive(Debug, Clone, Copy)]
pub struct Cluster<'a> {
    pub window: WindowSize,
    pub members: &'a [TradeEvent],
}

impl<'a> Cluster<'a> {
    pub fn new(window: WindowSize, members: &'a [TradeEvent]) -> Self {
        Self { window, members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn first_signer(&self) -> Option<&'a str> {
        self.members.first().map(|t| t.signer.as_str())
    }

    pub fn last_signer(&self) -> Option<&'a str> {
        self.members.last().map(|t| t.signer.as_str())
    }

    pub fn start_ms(&self) -> i64 {
        self.members.first().map_or(0, |t| t.timestamp_ms)
    }

    pub fn end_ms(&self) -> i64 {
        self.members.last().map_or(0, |t| t.timestamp_ms)
    }

    /// Elapsed time across members, never larger than the window
    pub fn span_ms(&self) -> u64 {
        (self.end_ms() - self.start_ms()).max(0) as u64
    }

    /// Inclusive slot range covered by the members
    pub fn slot_range(&self) -> (u64, u64) {
        let lo = self.members.iter().map(|t| t.slot).min().unwrap_or(0);
        let hi = self.members.iter().map(|t| t.slot).max().unwrap_or(0);
        (lo, hi)
    }
}

/// Two-pointer scanner emitting candidate clusters for one or more granularities
#[derive(Debug, Clone)]
pub struct WindowScanner {
    window_sizes: Vec<WindowSize>,
    min_trades: usize,
}

impl WindowScanner {
    pub fn new(window_sizes: Vec<WindowSize>, min_trades: usize) -> Self {
        Self {
            window_sizes,
            min_trades: min_trades.max(1),
        }
    }

    pub fn window_sizes(&self) -> &[WindowSize] {
        &self.window_sizes
    }

    /// Lazily scan `events` (sorted by timestamp) at a single granularity
    pub fn scan<'a>(&self, events: &'a [TradeEvent], window: WindowSize) -> ClusterIter<'a> {
        ClusterIter {
            events,
            window,
            min_trades: self.min_trades,
            left: 0,
            right: 0,
        }
    }

    /// Collect candidates at every configured granularity
    pub fn scan_all<'a>(&self, events: &'a [TradeEvent]) -> Vec<Cluster<'a>> {
        self.window_sizes
            .iter()
            .flat_map(|w| self.scan(events, *w))
            .collect()
    }
}

/// Iterator over the clusters of one granularity
///
/// For each right index the left index advances until the window holds, so
/// every emitted cluster is the widest window ending at its last member.
pub struct ClusterIter<'a> {
    events: &'a [TradeEvent],
    window: WindowSize,
    min_trades: usize,
    left: usize,
    right: usize,
}

impl<'a> Iterator for ClusterIter<'a> {
    type Item = Cluster<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let window_ms = self.window.as_span_ms();

        while self.right < self.events.len() {
            let right = self.right;
            self.right += 1;

            let right_ts = self.events[right].timestamp_ms;
            while right_ts - self.events[self.left].timestamp_ms > window_ms {
                self.left += 1;
            }

            if right + 1 - self.left >= self.min_trades {
                return Some(Cluster::new(self.window, &self.events[self.left..=right]));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_trade(signer: &str, timestamp_ms: i64) -> TradeEvent {
        TradeEvent::new(signer, timestamp_ms, 1, "P1", "WSOL", "PUMP")
    }

    #[test]
    fn test_window_labels() {
        assert_eq!(WindowSize::from_secs(2).as_label(), "2s");
        assert_eq!(WindowSize::from_millis(500).as_label(), "500ms");
        assert_eq!(WindowSize::from_label("10s"), Some(WindowSize::from_secs(10)));
        assert_eq!(WindowSize::from_label("250ms"), Some(WindowSize::from_millis(250)));
        assert_eq!(WindowSize::from_label("1h"), None);
    }

    #[test]
    fn test_huge_window_saturates() {
        let huge = WindowSize::from_secs(u64::MAX);
        assert_eq!(huge.as_millis(), u64::MAX);
        assert_eq!(huge.as_span_ms(), i64::MAX);
        assert_eq!(WindowSize::from_secs(10).as_span_ms(), 10_000);

        // Everything fits in one window rather than wrapping to a negative width
        let trades = vec![
            create_test_trade("A", 0),
            create_test_trade("B", 1_000_000),
            create_test_trade("A", 2_000_000),
        ];
        let scanner = WindowScanner::new(vec![huge], 3);
        let clusters: Vec<_> = scanner.scan(&trades, huge).collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn test_short_input_produces_nothing() {
        let scanner = WindowScanner::new(WindowSize::defaults().to_vec(), 5);
        let events: Vec<_> = (0..4).map(|i| create_test_trade("a", i * 10)).collect();

        assert!(scanner.scan_all(&events).is_empty());
        assert!(scanner.scan_all(&[]).is_empty());
    }

    #[test]
    fn test_left_pointer_advances_past_window() {
        let scanner = WindowScanner::new(vec![WindowSize::from_secs(1)], 3);
        let events = vec![
            create_test_trade("a", 0),
            create_test_trade("b", 400),
            create_test_trade("c", 900),
            create_test_trade("d", 1_300),
            create_test_trade("e", 1_500),
        ];

        let clusters: Vec<_> = scanner.scan(&events, WindowSize::from_secs(1)).collect();

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].first_signer(), Some("a"));
        assert_eq!(clusters[0].last_signer(), Some("c"));
        // a is 1300ms before d, so the window starts at b
        assert_eq!(clusters[1].first_signer(), Some("b"));
        assert_eq!(clusters[1].last_signer(), Some("d"));
        assert_eq!(clusters[2].first_signer(), Some("c"));
        assert_eq!(clusters[2].last_signer(), Some("e"));
        assert_eq!(clusters[2].len(), 3);
        for c in &clusters {
            assert!(c.span_ms() <= 1_000);
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let scanner = WindowScanner::new(vec![WindowSize::from_secs(1)], 2);
        let events = vec![create_test_trade("a", 0), create_test_trade("a", 1_000)];

        let clusters: Vec<_> = scanner.scan(&events, WindowSize::from_secs(1)).collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].span_ms(), 1_000);
    }

    #[test]
    fn test_granularities_overlap_independently() {
        let scanner = WindowScanner::new(
            vec![WindowSize::from_secs(1), WindowSize::from_secs(2)],
            3,
        );
        let events: Vec<_> = (0..3).map(|i| create_test_trade("a", i * 100)).collect();

        let clusters = scanner.scan_all(&events);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].window, WindowSize::from_secs(1));
        assert_eq!(clusters[1].window, WindowSize::from_secs(2));
        assert_eq!(clusters[0].members, clusters[1].members);
    }

    #[test]
    fn test_slot_range() {
        let mut events = vec![create_test_trade("a", 0), create_test_trade("b", 10)];
        events[0].slot = 7;
        events[1].slot = 9;
        let cluster = Cluster::new(WindowSize::from_secs(1), &events);
        assert_eq!(cluster.slot_range(), (7, 9));
    }
}
