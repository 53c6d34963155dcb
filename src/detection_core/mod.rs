//! Detection Core - Sandwich vs Multi-Hop Arbitrage Classification Engine
//!
//! Scans a time-ordered log of AMM trade events for clusters where one signer
//! brackets other traders, then decides whether the cluster looks like a fat
//! sandwich attack or a multi-hop arbitrage route.
//!
//! # Architecture
//!
//! ```text
//! JSONL export / SQLite trade_events → EventStore
//!     ↓
//! WindowScanner (1s, 2s, 5s, 10s two-pointer scan)
//!     ↓
//! PatternValidator (A…A bookend, victim ratio, token round trip)
//!     ↓
//! ConfidenceScorer (pattern_confidence, high/medium/low)
//!     ↓
//! AttackClassifier (fat vs multi scores, margin tie-break, oracle bursts)
//!     ↓
//! ResultWriter → JSONL, CSV or SQLite backend
//! ```

pub mod classifier;
pub mod correlator;
pub mod csv_writer;
pub mod engine;
pub mod event_store;
pub mod jsonl_writer;
pub mod normalizer;
pub mod reader;
pub mod result;
pub mod scorer;
pub mod sqlite_reader;
pub mod sqlite_writer;
pub mod validator;
pub mod window;
pub mod writer;
pub mod writer_backend;

pub use classifier::{
    AttackClassifier, AttackType, Classification, ScoringWeights, MARGIN_TOLERANCE,
};
pub use correlator::OracleBurstIndex;
pub use csv_writer::ClassificationCsvWriter;
pub use engine::{partition_by_gap, DetectionEngine, DetectionReport, ScanStats};
pub use event_store::{EventStore, InMemoryEventStore, IngestError};
pub use jsonl_writer::ClassificationJsonlWriter;
pub use normalizer::{MalformedRecord, RawTradeRecord, TokenPair, TradeEvent};
pub use reader::{JsonlEventReader, JsonlLoad};
pub use result::{ClassificationResult, DedupPolicy};
pub use scorer::{ConfidenceLevel, ConfidencePoints, ConfidenceScorer, PatternConfidence};
pub use sqlite_reader::SqliteEventStore;
pub use sqlite_writer::ClassificationSqliteWriter;
pub use validator::{PatternValidator, RejectReason, ValidatedCluster};
pub use window::{Cluster, WindowScanner, WindowSize};
pub use writer::{BackendType, ResultWriter};
pub use writer_backend::{ResultWriterBackend, ResultWriterError};
