//! Detection engine: scan → validate → score → classify over one or many partitions

use super::classifier::{AttackClassifier, AttackType};
use super::correlator::OracleBurstIndex;
use super::normalizer::TradeEvent;
use super::result::{sort_results, ClassificationResult, DedupPolicy};
use super::scorer::ConfidenceScorer;
use super::validator::{PatternValidator, RejectReason};
use super::window::{WindowScanner, WindowSize};
use crate::config::DetectionConfig;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Per-run counters; non-matching windows are the common case, not errors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub events: usize,
    pub partitions: usize,
    pub candidates: BTreeMap<WindowSize, usize>,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub below_confidence: usize,
    /// Labels assigned before deduplication
    pub classified: BTreeMap<AttackType, usize>,
    /// Results dropped by the dedup policy
    pub deduplicated: usize,
}

impl ScanStats {
    pub fn total_candidates(&self) -> usize {
        self.candidates.values().sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn total_classified(&self) -> usize {
        self.classified.values().sum()
    }

    pub fn merge(&mut self, other: &ScanStats) {
        self.events += other.events;
        self.partitions += other.partitions;
        for (k, v) in &other.candidates {
            *self.candidates.entry(*k).or_default() += v;
        }
        for (k, v) in &other.rejected {
            *self.rejected.entry(*k).or_default() += v;
        }
        self.below_confidence += other.below_confidence;
        for (k, v) in &other.classified {
            *self.classified.entry(*k).or_default() += v;
        }
        self.deduplicated += other.deduplicated;
    }

    pub fn log_summary(&self) {
        for (window, count) in &self.candidates {
            log::debug!("   {} candidates: {}", window, count);
        }
        for (reason, count) in &self.rejected {
            log::debug!("   rejected {}: {}", reason.as_str(), count);
        }
        log::debug!(
            "   {} events, {} candidates, {} rejected, {} below confidence, {} classified",
            self.events,
            self.total_candidates(),
            self.total_rejected(),
            self.below_confidence,
            self.total_classified()
        );
        if self.deduplicated > 0 {
            log::debug!("   {} overlapping results dropped by dedup", self.deduplicated);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub results: Vec<ClassificationResult>,
    pub stats: ScanStats,
}

/// Stateless pipeline; safe to share across partition workers
pub struct DetectionEngine {
    scanner: WindowScanner,
    validator: PatternValidator,
    scorer: ConfidenceScorer,
    classifier: AttackClassifier,
    min_pattern_confidence: f64,
    dedup_policy: DedupPolicy,
    max_window: WindowSize,
}

impl DetectionEngine {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            scanner: WindowScanner::new(config.window_sizes(), config.min_trades_per_window),
            validator: PatternValidator::new(config.min_attacker_trades, config.max_victim_ratio),
            scorer: ConfidenceScorer::new(
                config.confidence_points.clone(),
                config.high_confidence_cutoff,
                config.medium_confidence_cutoff,
            ),
            classifier: AttackClassifier::new(config.weights.clone(), config.classification_margin),
            min_pattern_confidence: config.min_pattern_confidence,
            dedup_policy: config.dedup_policy,
            max_window: config.max_window(),
        }
    }

    /// Run the full pipeline over one partition
    ///
    /// The oracle signal is taken from the events' `oracle_burst_in_window`
    /// column when present. Empty input yields an empty report.
    pub fn detect(&self, events: &[TradeEvent]) -> DetectionReport {
        let oracle = OracleBurstIndex::from_events(events);
        self.detect_with_oracle(events, oracle.as_ref())
    }

    /// Run the pipeline with an externally supplied oracle-burst index
    pub fn detect_with_oracle(
        &self,
        events: &[TradeEvent],
        oracle: Option<&OracleBurstIndex>,
    ) -> DetectionReport {
        let mut stats = ScanStats {
            events: events.len(),
            partitions: 1,
            ..ScanStats::default()
        };

        if events.is_empty() {
            log::debug!("Empty partition, nothing to scan");
            return DetectionReport {
                results: Vec::new(),
                stats,
            };
        }

        let events = time_ordered(events);
        let mut results = Vec::new();

        for &window in self.scanner.window_sizes() {
            for cluster in self.scanner.scan(&events, window) {
                *stats.candidates.entry(window).or_default() += 1;

                let validated = match self.validator.validate(cluster) {
                    Ok(v) => v,
                    Err(reason) => {
                        *stats.rejected.entry(reason).or_default() += 1;
                        continue;
                    }
                };

                let pattern = self.scorer.score(&validated);
                if pattern.score < self.min_pattern_confidence {
                    stats.below_confidence += 1;
                    continue;
                }

                let classification = self.classifier.classify(&validated, oracle);
                *stats.classified.entry(classification.attack_type).or_default() += 1;

                results.push(ClassificationResult::from_parts(
                    &validated,
                    pattern,
                    classification,
                ));
            }
        }

        sort_results(&mut results);
        let classified = results.len();
        let results = self.dedup_policy.apply(results);
        stats.deduplicated = classified - results.len();

        DetectionReport { results, stats }
    }

    /// Split at gaps no window can bridge, then run partitions on blocking workers
    pub async fn detect_partitioned(
        self: Arc<Self>,
        mut events: Vec<TradeEvent>,
    ) -> Result<DetectionReport, JoinError> {
        if !is_time_ordered(&events) {
            events.sort_by_key(|t| (t.timestamp_ms, t.slot));
        }

        let oracle = Arc::new(OracleBurstIndex::from_events(&events));
        let partitions: Vec<Vec<TradeEvent>> = partition_by_gap(&events, self.max_window)
            .into_iter()
            .map(|p| p.to_vec())
            .collect();
        drop(events);

        log::info!("🧩 Scanning {} partitions", partitions.len());

        let mut tasks = JoinSet::new();
        for partition in partitions {
            let engine = Arc::clone(&self);
            let oracle = Arc::clone(&oracle);
            tasks.spawn_blocking(move || {
                engine.detect_with_oracle(&partition, (*oracle).as_ref())
            });
        }

        let mut report = DetectionReport::default();
        while let Some(joined) = tasks.join_next().await {
            let partial = joined?;
            report.stats.merge(&partial.stats);
            report.results.extend(partial.results);
        }

        sort_results(&mut report.results);
        Ok(report)
    }
}

fn is_time_ordered(events: &[TradeEvent]) -> bool {
    events
        .windows(2)
        .all(|w| (w[0].timestamp_ms, w[0].slot) <= (w[1].timestamp_ms, w[1].slot))
}

fn time_ordered(events: &[TradeEvent]) -> Cow<'_, [TradeEvent]> {
    if is_time_ordered(events) {
        return Cow::Borrowed(events);
    }

    log::debug!("Input not time ordered, sorting {} events", events.len());
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|t| (t.timestamp_ms, t.slot));
    Cow::Owned(sorted)
}

/// Split time-ordered events wherever consecutive trades are further apart than
/// `max_window`; no cluster can span such a gap.
pub fn partition_by_gap(events: &[TradeEvent], max_window: WindowSize) -> Vec<&[TradeEvent]> {
    let max_gap = max_window.as_span_ms();
    let mut partitions = Vec::new();
    let mut start = 0;

    for i in 1..events.len() {
        if events[i].timestamp_ms - events[i - 1].timestamp_ms > max_gap {
            partitions.push(&events[start..i]);
            start = i;
        }
    }

    if start < events.len() {
        partitions.push(&events[start..]);
    }

    partitions
}
