//! Classification output records and optional cross-granularity dedup

use super::classifier::{AttackType, Classification};
use super::scorer::{ConfidenceLevel, PatternConfidence};
use super::validator::ValidatedCluster;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Final record for one validated cluster at one window granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub attacker_signer: String,
    pub victim_signers: Vec<String>,
    pub victim_count: usize,
    pub window_size_ms: u64,
    pub window_label: String,
    pub start_timestamp_ms: i64,
    pub end_timestamp_ms: i64,
    pub span_ms: u64,
    pub start_slot: u64,
    pub end_slot: u64,
    pub total_trades: usize,
    pub attacker_trade_count: usize,
    pub confidence: f64,
    pub pattern_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub attack_type: AttackType,
    pub fat_sandwich_score: f64,
    pub multi_hop_score: f64,
    pub token_pairs_used: usize,
    pub unique_pools: usize,
    pub is_cycle: bool,
    pub oracle_correlated: bool,
}

impl ClassificationResult {
    pub fn from_parts(
        validated: &ValidatedCluster<'_>,
        pattern: PatternConfidence,
        classification: Classification,
    ) -> Self {
        let cluster = &validated.cluster;
        let (start_slot, end_slot) = cluster.slot_range();

        Self {
            attacker_signer: validated.attacker.to_string(),
            // BTreeSet iteration keeps the order stable across runs
            victim_signers: validated.victims.iter().map(|s| s.to_string()).collect(),
            victim_count: validated.victim_count(),
            window_size_ms: cluster.window.as_millis(),
            window_label: cluster.window.as_label(),
            start_timestamp_ms: cluster.start_ms(),
            end_timestamp_ms: cluster.end_ms(),
            span_ms: cluster.span_ms(),
            start_slot,
            end_slot,
            total_trades: validated.total_trades(),
            attacker_trade_count: validated.attacker_trades.len(),
            confidence: classification.confidence,
            pattern_confidence: pattern.score,
            confidence_level: pattern.level,
            attack_type: classification.attack_type,
            fat_sandwich_score: classification.fat_sandwich_score,
            multi_hop_score: classification.multi_hop_score,
            token_pairs_used: classification.token_pairs_used,
            unique_pools: classification.unique_pools,
            is_cycle: classification.is_cycle,
            oracle_correlated: classification.oracle_correlated,
        }
    }

    fn overlaps(&self, other: &ClassificationResult) -> bool {
        self.attacker_signer == other.attacker_signer
            && self.start_timestamp_ms <= other.end_timestamp_ms
            && other.start_timestamp_ms <= self.end_timestamp_ms
    }
}

/// Deterministic output order
pub fn sort_results(results: &mut [ClassificationResult]) {
    results.sort_by(|a, b| {
        a.start_timestamp_ms
            .cmp(&b.start_timestamp_ms)
            .then(a.window_size_ms.cmp(&b.window_size_ms))
            .then_with(|| a.attacker_signer.cmp(&b.attacker_signer))
            .then(a.end_timestamp_ms.cmp(&b.end_timestamp_ms))
    });
}

/// Post-processing applied to overlapping multi-granularity detections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Every granularity reports independently
    #[default]
    KeepAll,
    /// One result per attacker and overlapping time range
    HighestConfidence,
}

impl DedupPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep_all" | "none" => Some(DedupPolicy::KeepAll),
            "highest_confidence" => Some(DedupPolicy::HighestConfidence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DedupPolicy::KeepAll => "keep_all",
            DedupPolicy::HighestConfidence => "highest_confidence",
        }
    }

    pub fn apply(&self, results: Vec<ClassificationResult>) -> Vec<ClassificationResult> {
        match self {
            DedupPolicy::KeepAll => results,
            DedupPolicy::HighestConfidence => keep_highest_confidence(results),
        }
    }
}

/// Better first: higher confidence, then finer window, then earlier start
fn rank(a: &ClassificationResult, b: &ClassificationResult) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then(a.window_size_ms.cmp(&b.window_size_ms))
        .then(a.start_timestamp_ms.cmp(&b.start_timestamp_ms))
        .then(a.end_timestamp_ms.cmp(&b.end_timestamp_ms))
}

fn keep_highest_confidence(mut results: Vec<ClassificationResult>) -> Vec<ClassificationResult> {
    results.sort_by(rank);

    let mut kept: Vec<ClassificationResult> = Vec::with_capacity(results.len());
    for candidate in results {
        if !kept.iter().any(|k| k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }

    sort_results(&mut kept);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_result(
        attacker: &str,
        window_ms: u64,
        start: i64,
        end: i64,
        confidence: f64,
    ) -> ClassificationResult {
        ClassificationResult {
            attacker_signer: attacker.to_string(),
            victim_signers: vec!["V1".to_string(), "V2".to_string()],
            victim_count: 2,
            window_size_ms: window_ms,
            window_label: format!("{}ms", window_ms),
            start_timestamp_ms: start,
            end_timestamp_ms: end,
            span_ms: (end - start) as u64,
            start_slot: 1,
            end_slot: 1,
            total_trades: 4,
            attacker_trade_count: 2,
            confidence,
            pattern_confidence: 0.6,
            confidence_level: ConfidenceLevel::Medium,
            attack_type: AttackType::FatSandwich,
            fat_sandwich_score: confidence,
            multi_hop_score: 0.0,
            token_pairs_used: 1,
            unique_pools: 1,
            is_cycle: false,
            oracle_correlated: false,
        }
    }

    #[test]
    fn test_keep_all_is_identity() {
        let results = vec![
            create_test_result("A", 1_000, 0, 500, 0.8),
            create_test_result("A", 2_000, 0, 500, 0.8),
        ];
        assert_eq!(DedupPolicy::KeepAll.apply(results.clone()), results);
    }

    #[test]
    fn test_highest_confidence_merges_overlaps() {
        let results = vec![
            create_test_result("A", 2_000, 0, 1_500, 0.6),
            create_test_result("A", 1_000, 100, 900, 0.8),
            create_test_result("A", 5_000, 0, 1_500, 0.8),
            create_test_result("B", 1_000, 100, 900, 0.5),
            create_test_result("A", 1_000, 10_000, 10_500, 0.4),
        ];

        let kept = DedupPolicy::HighestConfidence.apply(results);

        assert_eq!(kept.len(), 3);
        // tie at 0.8 goes to the finer window
        assert_eq!(kept[0].attacker_signer, "A");
        assert_eq!(kept[0].window_size_ms, 1_000);
        assert_eq!(kept[1].attacker_signer, "B");
        assert_eq!(kept[2].start_timestamp_ms, 10_000);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(DedupPolicy::from_str("keep_all"), Some(DedupPolicy::KeepAll));
        assert_eq!(
            DedupPolicy::from_str("HIGHEST_CONFIDENCE"),
            Some(DedupPolicy::HighestConfidence)
        );
        assert_eq!(DedupPolicy::from_str("merge"), None);
    }

    #[test]
    fn test_serialized_labels() {
        let json = serde_json::to_string(&create_test_result("A", 1_000, 0, 1, 0.8)).unwrap();
        assert!(json.contains(r#""attack_type":"fat_sandwich""#));
        assert!(json.contains(r#""confidence_level":"medium""#));
    }
}
