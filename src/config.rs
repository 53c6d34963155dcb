//! Detection configuration from environment variables

use crate::detection_core::classifier::ScoringWeights;
use crate::detection_core::result::DedupPolicy;
use crate::detection_core::scorer::ConfidencePoints;
use crate::detection_core::window::WindowSize;
use std::env;
use std::str::FromStr;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Longest accepted window; one day of trades is far beyond any sandwich
pub const MAX_WINDOW_SECONDS: u64 = 86_400;

/// Configuration for the detection engine
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Window durations to scan, in seconds
    pub window_sizes_seconds: Vec<u64>,

    /// Minimum cluster size to consider
    pub min_trades_per_window: usize,

    /// Upper bound on distinct victims / total trades
    pub max_victim_ratio: f64,

    /// Minimum trades by the bookending signer
    pub min_attacker_trades: usize,

    /// Lead a score needs over the other to win a label
    pub classification_margin: f64,

    /// Clusters below this pattern confidence are not classified (0.0 disables)
    pub min_pattern_confidence: f64,

    pub high_confidence_cutoff: f64,
    pub medium_confidence_cutoff: f64,

    pub weights: ScoringWeights,

    /// Pattern-confidence points per structural factor
    pub confidence_points: ConfidencePoints,

    pub dedup_policy: DedupPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_sizes_seconds: vec![1, 2, 5, 10],
            min_trades_per_window: 5,
            max_victim_ratio: 0.8,
            min_attacker_trades: 2,
            classification_margin: 0.15,
            min_pattern_confidence: 0.0,
            high_confidence_cutoff: 0.7,
            medium_confidence_cutoff: 0.4,
            weights: ScoringWeights::default(),
            confidence_points: ConfidencePoints::default(),
            dedup_policy: DedupPolicy::KeepAll,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Invalid {} '{}', using default", name, raw);
                default
            }
        },
        None => default,
    }
}

impl DetectionConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WINDOW_SIZES_SECONDS` (default: 1,2,5,10)
    /// - `MIN_TRADES_PER_WINDOW` (default: 5)
    /// - `MAX_VICTIM_RATIO` (default: 0.8)
    /// - `MIN_ATTACKER_TRADES` (default: 2)
    /// - `CLASSIFICATION_MARGIN` (default: 0.15)
    /// - `MIN_PATTERN_CONFIDENCE` (default: 0.0)
    /// - `HIGH_CONFIDENCE_CUTOFF` / `MEDIUM_CONFIDENCE_CUTOFF` (default: 0.7 / 0.4)
    /// - `WEIGHT_*` scoring weights (see `ScoringWeights`)
    /// - `POINTS_*` pattern-confidence points (see `ConfidencePoints`)
    /// - `DEDUP_POLICY` (default: keep_all)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` with an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let dw = &defaults.weights;
        let dp = &defaults.confidence_points;

        let window_sizes_seconds = match lookup("WINDOW_SIZES_SECONDS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>().map_err(|_| {
                        ConfigError::InvalidValue(format!("WINDOW_SIZES_SECONDS entry '{}'", s))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.window_sizes_seconds.clone(),
        };

        let dedup_policy = match lookup("DEDUP_POLICY") {
            Some(raw) => DedupPolicy::from_str(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "DEDUP_POLICY must be keep_all or highest_confidence, got '{}'",
                    raw
                ))
            })?,
            None => defaults.dedup_policy,
        };

        let weights = ScoringWeights {
            fat_victims: parse_or(&lookup, "WEIGHT_FAT_VICTIMS", dw.fat_victims),
            fat_same_pair: parse_or(&lookup, "WEIGHT_FAT_SAME_PAIR", dw.fat_same_pair),
            fat_few_pools: parse_or(&lookup, "WEIGHT_FAT_FEW_POOLS", dw.fat_few_pools),
            fat_oracle: parse_or(&lookup, "WEIGHT_FAT_ORACLE", dw.fat_oracle),
            multi_no_victims: parse_or(&lookup, "WEIGHT_MULTI_NO_VICTIMS", dw.multi_no_victims),
            multi_cycle_pairs: parse_or(&lookup, "WEIGHT_MULTI_CYCLE_PAIRS", dw.multi_cycle_pairs),
            multi_many_pools: parse_or(&lookup, "WEIGHT_MULTI_MANY_POOLS", dw.multi_many_pools),
            multi_cycle: parse_or(&lookup, "WEIGHT_MULTI_CYCLE", dw.multi_cycle),
        };

        let confidence_points = ConfidencePoints {
            low_victim_ratio: parse_or(&lookup, "POINTS_LOW_VICTIM_RATIO", dp.low_victim_ratio),
            moderate_victim_ratio: parse_or(
                &lookup,
                "POINTS_MODERATE_VICTIM_RATIO",
                dp.moderate_victim_ratio,
            ),
            repeated_attacker: parse_or(&lookup, "POINTS_REPEATED_ATTACKER", dp.repeated_attacker),
            token_round_trip: parse_or(&lookup, "POINTS_TOKEN_ROUND_TRIP", dp.token_round_trip),
            short_window: parse_or(&lookup, "POINTS_SHORT_WINDOW", dp.short_window),
            broad_impact: parse_or(&lookup, "POINTS_BROAD_IMPACT", dp.broad_impact),
        };

        let config = Self {
            window_sizes_seconds,
            min_trades_per_window: parse_or(
                &lookup,
                "MIN_TRADES_PER_WINDOW",
                defaults.min_trades_per_window,
            ),
            max_victim_ratio: parse_or(&lookup, "MAX_VICTIM_RATIO", defaults.max_victim_ratio),
            min_attacker_trades: parse_or(
                &lookup,
                "MIN_ATTACKER_TRADES",
                defaults.min_attacker_trades,
            ),
            classification_margin: parse_or(
                &lookup,
                "CLASSIFICATION_MARGIN",
                defaults.classification_margin,
            ),
            min_pattern_confidence: parse_or(
                &lookup,
                "MIN_PATTERN_CONFIDENCE",
                defaults.min_pattern_confidence,
            ),
            high_confidence_cutoff: parse_or(
                &lookup,
                "HIGH_CONFIDENCE_CUTOFF",
                defaults.high_confidence_cutoff,
            ),
            medium_confidence_cutoff: parse_or(
                &lookup,
                "MEDIUM_CONFIDENCE_CUTOFF",
                defaults.medium_confidence_cutoff,
            ),
            weights,
            confidence_points,
            dedup_policy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_sizes_seconds.is_empty() {
            return Err(ConfigError::InvalidValue(
                "window_sizes_seconds cannot be empty".to_string(),
            ));
        }

        if self.window_sizes_seconds.contains(&0) {
            return Err(ConfigError::InvalidValue(
                "window sizes must be at least 1 second".to_string(),
            ));
        }

        if let Some(secs) = self
            .window_sizes_seconds
            .iter()
            .find(|s| **s > MAX_WINDOW_SECONDS)
        {
            return Err(ConfigError::InvalidValue(format!(
                "window size {}s exceeds the {}s maximum",
                secs, MAX_WINDOW_SECONDS
            )));
        }

        if self.min_trades_per_window < 2 {
            return Err(ConfigError::InvalidValue(format!(
                "min_trades_per_window must be >= 2, got {}",
                self.min_trades_per_window
            )));
        }

        if self.min_attacker_trades < 2 {
            return Err(ConfigError::InvalidValue(format!(
                "min_attacker_trades must be >= 2, got {}",
                self.min_attacker_trades
            )));
        }

        let unit_range = [
            ("max_victim_ratio", self.max_victim_ratio),
            ("classification_margin", self.classification_margin),
            ("min_pattern_confidence", self.min_pattern_confidence),
            ("high_confidence_cutoff", self.high_confidence_cutoff),
            ("medium_confidence_cutoff", self.medium_confidence_cutoff),
        ];
        for (name, value) in unit_range {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.medium_confidence_cutoff > self.high_confidence_cutoff {
            return Err(ConfigError::InvalidValue(
                "medium_confidence_cutoff cannot exceed high_confidence_cutoff".to_string(),
            ));
        }

        let p = &self.confidence_points;
        let points = [
            p.low_victim_ratio,
            p.moderate_victim_ratio,
            p.repeated_attacker,
            p.token_round_trip,
            p.short_window,
            p.broad_impact,
        ];
        if points.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidValue(
                "confidence points must be finite and non-negative".to_string(),
            ));
        }
        if p.max_points() <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "confidence points cannot all be zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured granularities, sorted and deduplicated
    pub fn window_sizes(&self) -> Vec<WindowSize> {
        let mut sizes: Vec<WindowSize> = self
            .window_sizes_seconds
            .iter()
            .map(|s| WindowSize::from_secs(*s))
            .collect();
        sizes.sort();
        sizes.dedup();
        sizes
    }

    pub fn max_window(&self) -> WindowSize {
        self.window_sizes()
            .last()
            .copied()
            .unwrap_or_else(|| WindowSize::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DetectionConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.window_sizes_seconds, vec![1, 2, 5, 10]);
        assert_eq!(config.min_trades_per_window, 5);
        assert_eq!(config.max_victim_ratio, 0.8);
        assert_eq!(config.min_attacker_trades, 2);
        assert_eq!(config.classification_margin, 0.15);
        assert_eq!(config.weights, ScoringWeights::default());
        assert_eq!(config.confidence_points, ConfidencePoints::default());
        assert_eq!(config.dedup_policy, DedupPolicy::KeepAll);
    }

    #[test]
    fn test_custom_config() {
        let config = DetectionConfig::from_lookup(lookup_from(&[
            ("WINDOW_SIZES_SECONDS", "10, 2,2"),
            ("MIN_TRADES_PER_WINDOW", "3"),
            ("CLASSIFICATION_MARGIN", "0.2"),
            ("WEIGHT_MULTI_CYCLE", "0.4"),
            ("DEDUP_POLICY", "highest_confidence"),
        ]))
        .unwrap();

        assert_eq!(config.window_sizes_seconds, vec![10, 2, 2]);
        assert_eq!(
            config.window_sizes(),
            vec![WindowSize::from_secs(2), WindowSize::from_secs(10)]
        );
        assert_eq!(config.max_window(), WindowSize::from_secs(10));
        assert_eq!(config.min_trades_per_window, 3);
        assert_eq!(config.classification_margin, 0.2);
        assert_eq!(config.weights.multi_cycle, 0.4);
        assert_eq!(config.dedup_policy, DedupPolicy::HighestConfidence);
    }

    #[test]
    fn test_unparseable_number_falls_back() {
        let config =
            DetectionConfig::from_lookup(lookup_from(&[("MAX_VICTIM_RATIO", "lots")])).unwrap();
        assert_eq!(config.max_victim_ratio, 0.8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DetectionConfig::from_lookup(lookup_from(&[("WINDOW_SIZES_SECONDS", "1,x")]))
            .is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("WINDOW_SIZES_SECONDS", "0")]))
            .is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("MAX_VICTIM_RATIO", "1.5")]))
            .is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("MIN_ATTACKER_TRADES", "1")]))
            .is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("DEDUP_POLICY", "merge")])).is_err());
    }

    #[test]
    fn test_confidence_points_from_env() {
        let config = DetectionConfig::from_lookup(lookup_from(&[
            ("POINTS_LOW_VICTIM_RATIO", "5"),
            ("POINTS_SHORT_WINDOW", "0"),
            ("POINTS_BROAD_IMPACT", "nope"),
        ]))
        .unwrap();

        let points = &config.confidence_points;
        assert_eq!(points.low_victim_ratio, 5.0);
        assert_eq!(points.short_window, 0.0);
        assert_eq!(points.broad_impact, 1.0);
        assert_eq!(points.repeated_attacker, 2.0);
        assert_eq!(points.max_points(), 10.0);

        assert!(
            DetectionConfig::from_lookup(lookup_from(&[("POINTS_TOKEN_ROUND_TRIP", "-1")]))
                .is_err()
        );
        let all_zero: Vec<(&str, &str)> = [
            "POINTS_LOW_VICTIM_RATIO",
            "POINTS_MODERATE_VICTIM_RATIO",
            "POINTS_REPEATED_ATTACKER",
            "POINTS_TOKEN_ROUND_TRIP",
            "POINTS_SHORT_WINDOW",
            "POINTS_BROAD_IMPACT",
        ]
        .iter()
        .map(|name| (*name, "0"))
        .collect();
        assert!(DetectionConfig::from_lookup(lookup_from(&all_zero)).is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let err = DetectionConfig::from_lookup(lookup_from(&[(
            "WINDOW_SIZES_SECONDS",
            "1,18446744073709551615",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        let config = DetectionConfig::from_lookup(lookup_from(&[(
            "WINDOW_SIZES_SECONDS",
            "86400",
        )]))
        .unwrap();
        assert_eq!(config.max_window(), WindowSize::from_secs(MAX_WINDOW_SECONDS));
    }
}
