//! Trade normalization from cleaned exports to the immutable TradeEvent struct

use serde::{Deserialize, Serialize};

/// One on-chain swap instruction. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub signer: String,
    pub timestamp_ms: i64,
    pub slot: u64,
    pub pool_id: String,
    pub token_in: String,
    pub token_out: String,
    pub validator: Option<String>,
    pub oracle_burst_in_window: Option<bool>,
    pub signature: Option<String>,
}

/// Ingestion shape: every column is optional until validated
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTradeRecord {
    pub signer: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub slot: Option<u64>,
    pub pool_id: Option<String>,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub validator: Option<String>,
    pub oracle_burst_in_window: Option<bool>,
    pub signature: Option<String>,
}

/// A record that can never enter a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    InvalidJson(String),
    MissingField(&'static str),
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedRecord::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
            MalformedRecord::MissingField(name) => write!(f, "Missing required field: {}", name),
        }
    }
}

impl std::error::Error for MalformedRecord {}

fn required(value: Option<String>, name: &'static str) -> Result<String, MalformedRecord> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MalformedRecord::MissingField(name)),
    }
}

impl TryFrom<RawTradeRecord> for TradeEvent {
    type Error = MalformedRecord;

    fn try_from(raw: RawTradeRecord) -> Result<Self, Self::Error> {
        let signer = required(raw.signer, "signer")?;
        let timestamp_ms = raw
            .timestamp_ms
            .ok_or(MalformedRecord::MissingField("timestamp_ms"))?;

        Ok(TradeEvent {
            signer,
            timestamp_ms,
            slot: raw.slot.unwrap_or(0),
            pool_id: required(raw.pool_id, "pool_id")?,
            token_in: required(raw.token_in, "token_in")?,
            token_out: required(raw.token_out, "token_out")?,
            validator: raw.validator,
            oracle_burst_in_window: raw.oracle_burst_in_window,
            signature: raw.signature,
        })
    }
}

impl TradeEvent {
    /// Build a minimal event (no validator, oracle flag or signature)
    pub fn new(
        signer: impl Into<String>,
        timestamp_ms: i64,
        slot: u64,
        pool_id: impl Into<String>,
        token_in: impl Into<String>,
        token_out: impl Into<String>,
    ) -> Self {
        Self {
            signer: signer.into(),
            timestamp_ms,
            slot,
            pool_id: pool_id.into(),
            token_in: token_in.into(),
            token_out: token_out.into(),
            validator: None,
            oracle_burst_in_window: None,
            signature: None,
        }
    }

    /// Parse a TradeEvent from a JSONL line, enforcing required fields
    pub fn from_jsonl(line: &str) -> Result<Self, MalformedRecord> {
        let raw: RawTradeRecord = serde_json::from_str(line)
            .map_err(|e| MalformedRecord::InvalidJson(e.to_string()))?;
        TradeEvent::try_from(raw)
    }

    /// Direction-insensitive asset pair of this swap
    pub fn token_pair(&self) -> TokenPair {
        TokenPair::new(&self.token_in, &self.token_out)
    }

    /// True when `other` swaps the same two assets in the opposite direction
    pub fn is_reverse_of(&self, other: &TradeEvent) -> bool {
        self.token_in == other.token_out && self.token_out == other.token_in
    }
}

/// Unordered asset pair, stored with the lexicographically smaller asset first
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenPair {
    low: String,
    high: String,
}

impl TokenPair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { low: a.to_string(), high: b.to_string() }
        } else {
            Self { low: b.to_string(), high: a.to_string() }
        }
    }

    pub fn assets(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }
}

impl std::fmt::Display for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let line = r#"{"signer":"EcBxqSKKzWyBLhLLiw9VCrCvd6UwHG9A4TZ1sphpGqxf","timestamp_ms":1763026318120,"slot":312000123,"pool_id":"pAMMpool1","token_in":"WSOL","token_out":"PUMP","validator":"val1","oracle_burst_in_window":true,"signature":"7JLwTTCQ"}"#;

        let event = TradeEvent::from_jsonl(line).unwrap();
        assert_eq!(event.signer, "EcBxqSKKzWyBLhLLiw9VCrCvd6UwHG9A4TZ1sphpGqxf");
        assert_eq!(event.timestamp_ms, 1763026318120);
        assert_eq!(event.slot, 312000123);
        assert_eq!(event.token_in, "WSOL");
        assert_eq!(event.validator.as_deref(), Some("val1"));
        assert_eq!(event.oracle_burst_in_window, Some(true));
    }

    #[test]
    fn test_optional_columns_default() {
        let line = r#"{"signer":"bot","timestamp_ms":1000,"pool_id":"P1","token_in":"SOL","token_out":"A"}"#;

        let event = TradeEvent::from_jsonl(line).unwrap();
        assert_eq!(event.slot, 0);
        assert!(event.validator.is_none());
        assert!(event.oracle_burst_in_window.is_none());
    }

    #[test]
    fn test_missing_signer_is_malformed() {
        let line = r#"{"timestamp_ms":1000,"pool_id":"P1","token_in":"SOL","token_out":"A"}"#;
        assert_eq!(
            TradeEvent::from_jsonl(line),
            Err(MalformedRecord::MissingField("signer"))
        );
    }

    #[test]
    fn test_missing_timestamp_is_malformed() {
        let line = r#"{"signer":"bot","pool_id":"P1","token_in":"SOL","token_out":"A"}"#;
        assert_eq!(
            TradeEvent::from_jsonl(line),
            Err(MalformedRecord::MissingField("timestamp_ms"))
        );
    }

    #[test]
    fn test_invalid_json() {
        let line = r#"{"invalid": "json"#;
        assert!(matches!(
            TradeEvent::from_jsonl(line),
            Err(MalformedRecord::InvalidJson(_))
        ));
    }

    #[test]
    fn test_token_pair_is_unordered() {
        let buy = TradeEvent::new("a", 1, 1, "P1", "WSOL", "PUMP");
        let sell = TradeEvent::new("a", 2, 1, "P1", "PUMP", "WSOL");

        assert_eq!(buy.token_pair(), sell.token_pair());
        assert!(buy.is_reverse_of(&sell));
        assert!(!buy.is_reverse_of(&buy));
        assert_eq!(buy.token_pair().to_string(), "PUMP/WSOL");
    }
}
