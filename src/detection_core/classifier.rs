//! Fat-sandwich vs multi-hop arbitrage classification with a margin-based decision

use super::correlator::OracleBurstIndex;
use super::normalizer::{TokenPair, TradeEvent};
use super::validator::ValidatedCluster;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    FatSandwich,
    MultiHopArbitrage,
    Ambiguous,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::FatSandwich => "fat_sandwich",
            AttackType::MultiHopArbitrage => "multi_hop_arbitrage",
            AttackType::Ambiguous => "ambiguous",
        }
    }
}

/// Per-signal weights; each signal feeds exactly one of the two scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// victim_count >= 2
    pub fat_victims: f64,
    /// all attacker trades on one unordered pair
    pub fat_same_pair: f64,
    /// attacker touches 1-2 pools
    pub fat_few_pools: f64,
    /// oracle burst within the cluster's slots
    pub fat_oracle: f64,
    /// victim_count == 0
    pub multi_no_victims: f64,
    /// >= 3 distinct pairs forming a cycle
    pub multi_cycle_pairs: f64,
    /// attacker touches >= 3 pools
    pub multi_many_pools: f64,
    /// net-balance closure
    pub multi_cycle: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            fat_victims: 0.35,
            fat_same_pair: 0.25,
            fat_few_pools: 0.20,
            fat_oracle: 0.20,
            multi_no_victims: 0.20,
            multi_cycle_pairs: 0.25,
            multi_many_pools: 0.20,
            multi_cycle: 0.35,
        }
    }
}

/// Classifier output for one validated cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub attack_type: AttackType,
    pub confidence: f64,
    pub fat_sandwich_score: f64,
    pub multi_hop_score: f64,
    pub token_pairs_used: usize,
    pub unique_pools: usize,
    pub is_cycle: bool,
    pub oracle_correlated: bool,
}

pub struct AttackClassifier {
    weights: ScoringWeights,
    margin: f64,
}

impl AttackClassifier {
    pub fn new(weights: ScoringWeights, margin: f64) -> Self {
        Self { weights, margin }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringWeights::default(), 0.15)
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Score both hypotheses and pick a label
    ///
    /// Scores are independent accumulators capped at 1.0, not a distribution.
    /// `oracle` is `None` when the oracle-burst signal was not supplied.
    pub fn classify(
        &self,
        validated: &ValidatedCluster<'_>,
        oracle: Option<&OracleBurstIndex>,
    ) -> Classification {
        let w = &self.weights;
        let trades = &validated.attacker_trades;
        let victim_count = validated.victim_count();

        let pairs: BTreeSet<TokenPair> = trades.iter().map(|t| t.token_pair()).collect();
        let pools: BTreeSet<&str> = trades.iter().map(|t| t.pool_id.as_str()).collect();
        let is_cycle = is_closed_cycle(trades);

        let (start_slot, end_slot) = validated.cluster.slot_range();
        let oracle_correlated = oracle.map_or(false, |idx| idx.correlates(start_slot, end_slot));

        let mut fat = 0.0;
        let mut multi = 0.0;

        // Victims
        if victim_count >= 2 {
            fat += w.fat_victims;
        } else if victim_count == 0 {
            multi += w.multi_no_victims;
        }

        // Token structure
        if pairs.len() == 1 {
            fat += w.fat_same_pair;
        } else if pairs.len() >= 3 && is_cycle {
            multi += w.multi_cycle_pairs;
        }

        // Pool diversity
        match pools.len() {
            1 | 2 => fat += w.fat_few_pools,
            n if n >= 3 => multi += w.multi_many_pools,
            _ => {}
        }

        // Cycle closure
        if is_cycle {
            multi += w.multi_cycle;
        }

        // Oracle timing
        if oracle_correlated {
            fat += w.fat_oracle;
        }

        let fat_sandwich_score = fat.clamp(0.0, 1.0);
        let multi_hop_score = multi.clamp(0.0, 1.0);
        let attack_type = decide(fat_sandwich_score, multi_hop_score, self.margin);
        let confidence = match attack_type {
            AttackType::FatSandwich => fat_sandwich_score,
            AttackType::MultiHopArbitrage => multi_hop_score,
            AttackType::Ambiguous => fat_sandwich_score.max(multi_hop_score),
        };

        Classification {
            attack_type,
            confidence,
            fat_sandwich_score,
            multi_hop_score,
            token_pairs_used: pairs.len(),
            unique_pools: pools.len(),
            is_cycle,
            oracle_correlated,
        }
    }
}

/// Absorbs rounding in the weight sums; a lead within this of `margin` is a tie
pub const MARGIN_TOLERANCE: f64 = 1e-9;

/// Margin decision: a label only wins when it leads by more than `margin`
///
/// A lead equal to the margin (up to [`MARGIN_TOLERANCE`]) is ambiguous.
pub fn decide(fat_sandwich_score: f64, multi_hop_score: f64, margin: f64) -> AttackType {
    let threshold = margin + MARGIN_TOLERANCE;
    if fat_sandwich_score - multi_hop_score > threshold {
        AttackType::FatSandwich
    } else if multi_hop_score - fat_sandwich_score > threshold {
        AttackType::MultiHopArbitrage
    } else {
        AttackType::Ambiguous
    }
}

/// Structural net-balance check over the attacker's ordered trades
///
/// Each trade moves one unit out of `token_in` and into `token_out`. The path is
/// closed when every asset except the starting one nets to zero.
pub fn is_closed_cycle(trades: &[&TradeEvent]) -> bool {
    let Some(first) = trades.first() else {
        return false;
    };
    let start = first.token_in.as_str();

    let mut balances: HashMap<&str, i64> = HashMap::new();
    for t in trades {
        *balances.entry(t.token_in.as_str()).or_default() -= 1;
        *balances.entry(t.token_out.as_str()).or_default() += 1;
    }

    balances
        .iter()
        .all(|(asset, balance)| *asset == start || *balance == 0)
}
