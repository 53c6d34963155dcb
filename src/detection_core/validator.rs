//! Structural A…A validation and victim partition for candidate clusters

use super::classifier::is_closed_cycle;
use super::normalizer::TradeEvent;
use super::window::Cluster;
use std::collections::BTreeSet;

/// Why a candidate cluster was dropped. Expected for most windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    /// First and last trades come from different signers
    NotBookended,
    /// Bookending signer trades fewer than `min_attacker_trades` times
    TooFewAttackerTrades,
    /// Too many distinct signers relative to the cluster size
    VictimRatioExceeded,
    /// Back-run neither reverses the front-run nor closes a cycle
    NoTokenRoundTrip,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotBookended => "not_bookended",
            RejectReason::TooFewAttackerTrades => "too_few_attacker_trades",
            RejectReason::VictimRatioExceeded => "victim_ratio_exceeded",
            RejectReason::NoTokenRoundTrip => "no_token_round_trip",
        }
    }
}

/// Cluster that passed every structural check
#[derive(Debug, Clone)]
pub struct ValidatedCluster<'a> {
    pub cluster: Cluster<'a>,
    pub attacker: &'a str,
    /// Attacker trades in time order; first is the front-run, last the back-run
    pub attacker_trades: Vec<&'a TradeEvent>,
    pub victims: BTreeSet<&'a str>,
}

impl<'a> ValidatedCluster<'a> {
    pub fn victim_count(&self) -> usize {
        self.victims.len()
    }

    pub fn total_trades(&self) -> usize {
        self.cluster.len()
    }

    pub fn victim_ratio(&self) -> f64 {
        victim_ratio(self.victim_count(), self.total_trades())
    }
}

fn victim_ratio(victim_count: usize, total_trades: usize) -> f64 {
    if total_trades == 0 {
        return 0.0;
    }
    victim_count as f64 / total_trades as f64
}

pub struct PatternValidator {
    min_attacker_trades: usize,
    max_victim_ratio: f64,
}

impl PatternValidator {
    pub fn new(min_attacker_trades: usize, max_victim_ratio: f64) -> Self {
        Self {
            min_attacker_trades,
            max_victim_ratio,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(2, 0.8)
    }

    /// Check the sandwich shape of a candidate cluster
    ///
    /// # Checks (in order)
    /// 1. First and last members share a signer (the presumptive attacker)
    /// 2. That signer trades at least `min_attacker_trades` times
    /// 3. Distinct victims / total trades stays within `max_victim_ratio`
    /// 4. The back-run reverses the front-run's pair, or the attacker's path
    ///    is a closed net-balance cycle
    pub fn validate<'a>(&self, cluster: Cluster<'a>) -> Result<ValidatedCluster<'a>, RejectReason> {
        let (first, last) = match (cluster.members.first(), cluster.members.last()) {
            (Some(first), Some(last)) if cluster.len() >= 2 => (first, last),
            _ => return Err(RejectReason::NotBookended),
        };

        if first.signer != last.signer {
            return Err(RejectReason::NotBookended);
        }
        let attacker = first.signer.as_str();

        let attacker_trades: Vec<&TradeEvent> = cluster
            .members
            .iter()
            .filter(|t| t.signer == attacker)
            .collect();

        if attacker_trades.len() < self.min_attacker_trades {
            return Err(RejectReason::TooFewAttackerTrades);
        }

        // Strictly between front-run and back-run, attacker trades excluded
        let inner = &cluster.members[1..cluster.len() - 1];
        let victims: BTreeSet<&str> = inner
            .iter()
            .filter(|t| t.signer != attacker)
            .map(|t| t.signer.as_str())
            .collect();

        if victim_ratio(victims.len(), cluster.len()) > self.max_victim_ratio {
            return Err(RejectReason::VictimRatioExceeded);
        }

        if !last.is_reverse_of(first) && !is_closed_cycle(&attacker_trades) {
            return Err(RejectReason::NoTokenRoundTrip);
        }

        Ok(ValidatedCluster {
            cluster,
            attacker,
            attacker_trades,
            victims,
        })
    }
}
