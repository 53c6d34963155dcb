//! Confidence scoring: how likely a validated cluster is deliberate, not coincidental

use super::validator::ValidatedCluster;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Point values for each confidence component
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidencePoints {
    pub low_victim_ratio: f64,
    pub moderate_victim_ratio: f64,
    pub repeated_attacker: f64,
    pub token_round_trip: f64,
    pub short_window: f64,
    pub broad_impact: f64,
}

impl Default for ConfidencePoints {
    fn default() -> Self {
        Self {
            low_victim_ratio: 3.0,
            moderate_victim_ratio: 1.0,
            repeated_attacker: 2.0,
            token_round_trip: 2.0,
            short_window: 2.0,
            broad_impact: 1.0,
        }
    }
}

impl ConfidencePoints {
    /// Best achievable total; the ratio bands are exclusive so only the larger counts
    pub fn max_points(&self) -> f64 {
        self.low_victim_ratio.max(self.moderate_victim_ratio)
            + self.repeated_attacker
            + self.token_round_trip
            + self.short_window
            + self.broad_impact
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternConfidence {
    pub score: f64,
    pub level: ConfidenceLevel,
}

pub struct ConfidenceScorer {
    points: ConfidencePoints,
    high_cutoff: f64,
    medium_cutoff: f64,
}

const SHORT_WINDOW_MS: u64 = 2_000;

impl ConfidenceScorer {
    pub fn new(points: ConfidencePoints, high_cutoff: f64, medium_cutoff: f64) -> Self {
        Self {
            points,
            high_cutoff,
            medium_cutoff,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ConfidencePoints::default(), 0.7, 0.4)
    }

    /// Compute pattern confidence (0.0-1.0)
    ///
    /// # Factors
    /// - Victim ratio (< 0.3 strong, 0.3-0.5 weak)
    /// - Attacker repetition (>= 3 trades)
    /// - Token round trip (always true once validated)
    /// - Window speed (<= 2s)
    /// - Breadth of impact (>= 3 victims)
    pub fn score(&self, validated: &ValidatedCluster<'_>) -> PatternConfidence {
        let p = &self.points;
        let mut points = 0.0;

        let ratio = validated.victim_ratio();
        if ratio < 0.3 {
            points += p.low_victim_ratio;
        } else if ratio <= 0.5 {
            points += p.moderate_victim_ratio;
        }

        if validated.attacker_trades.len() >= 3 {
            points += p.repeated_attacker;
        }

        points += p.token_round_trip;

        if validated.cluster.window.as_millis() <= SHORT_WINDOW_MS {
            points += p.short_window;
        }

        if validated.victim_count() >= 3 {
            points += p.broad_impact;
        }

        let max = p.max_points();
        let score = if max > 0.0 { (points / max).clamp(0.0, 1.0) } else { 0.0 };

        PatternConfidence {
            score,
            level: self.level_for(score),
        }
    }

    pub fn level_for(&self, score: f64) -> ConfidenceLevel {
        if score >= self.high_cutoff {
            ConfidenceLevel::High
        } else if score >= self.medium_cutoff {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}
