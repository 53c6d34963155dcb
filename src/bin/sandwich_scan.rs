//! Sandwich Scan Binary - Fat Sandwich vs Multi-Hop Arbitrage Detection
//!
//! Reads a cleaned trade event export, scans it at every configured window
//! granularity and writes one classification per validated cluster.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin sandwich_scan -- --input data/trades.jsonl
//! cargo run --release --bin sandwich_scan -- --input data/trades.db --backend sqlite
//! cargo run --release --bin sandwich_scan -- --input data/trades.jsonl --backend csv --output reports
//! ```
//!
//! ## Environment Variables
//!
//! - SANDWATCH_INPUT_PATH - Input when --input is absent (`.db`/`.sqlite` read as SQLite, else JSONL)
//! - SANDWATCH_OUTPUT_PATH - Output when --output is absent
//!   (default: streams/classifications, or data/sandwatch.db with --backend sqlite)
//! - WINDOW_SIZES_SECONDS, MIN_TRADES_PER_WINDOW, MAX_VICTIM_RATIO, MIN_ATTACKER_TRADES,
//!   CLASSIFICATION_MARGIN, MIN_PATTERN_CONFIDENCE, WEIGHT_*, POINTS_*, DEDUP_POLICY - detection tuning
//! - RUST_LOG - Logging level (optional, default: info)

use chrono::{DateTime, Utc};
use sandwatch::config::DetectionConfig;
use sandwatch::detection_core::{
    AttackType, BackendType, DetectionEngine, EventStore, JsonlEventReader, ResultWriter,
    SqliteEventStore, TradeEvent,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|x| x == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

#[derive(Debug)]
struct ScanArgs {
    input: PathBuf,
    backend: BackendType,
    output: PathBuf,
}

impl ScanArgs {
    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let args: Vec<String> = env::args().collect();

        let input = arg_value(&args, "--input")
            .or_else(|| env::var("SANDWATCH_INPUT_PATH").ok())
            .ok_or("missing --input <path> (or SANDWATCH_INPUT_PATH)")?;

        let backend = match arg_value(&args, "--backend") {
            Some(raw) => BackendType::from_str(&raw)
                .ok_or_else(|| format!("unknown backend '{}' (jsonl|csv|sqlite)", raw))?,
            None => BackendType::default(),
        };

        let output = arg_value(&args, "--output")
            .or_else(|| env::var("SANDWATCH_OUTPUT_PATH").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| backend.default_output());

        Ok(Self {
            input: input.into(),
            backend,
            output,
        })
    }
}

fn is_sqlite_input(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db") | Some("sqlite")
    )
}

async fn load_events(path: &Path) -> Result<Vec<TradeEvent>, Box<dyn std::error::Error>> {
    if is_sqlite_input(path) {
        let path = path.to_path_buf();
        let events = tokio::task::spawn_blocking(move || {
            SqliteEventStore::new(&path).and_then(|store| store.all_events())
        })
        .await??;
        return Ok(events);
    }

    let load = JsonlEventReader::new(path).read_all().await?;
    if load.skipped > 0 {
        log::warn!("⚠️  {} malformed records skipped", load.skipped);
    }
    Ok(load.events)
}

fn format_ms(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args = ScanArgs::from_env()?;
    let config = DetectionConfig::from_env()?;

    log::info!("🚀 Starting Sandwich Scan");
    log::info!("   Input: {}", args.input.display());
    log::info!("   Output: {}", args.output.display());
    log::info!("   Windows: {:?}s", config.window_sizes_seconds);
    log::info!("   Min trades per window: {}", config.min_trades_per_window);
    log::info!("   Max victim ratio: {}", config.max_victim_ratio);
    log::info!("   Classification margin: {}", config.classification_margin);
    log::info!("   Dedup policy: {}", config.dedup_policy.as_str());

    let started = Instant::now();
    let events = load_events(&args.input).await?;

    if let (Some(first), Some(last)) = (
        events.iter().map(|t| t.timestamp_ms).min(),
        events.iter().map(|t| t.timestamp_ms).max(),
    ) {
        log::info!("   Time range: {} → {}", format_ms(first), format_ms(last));
    } else {
        log::info!("📭 No events to scan");
    }

    let engine = Arc::new(DetectionEngine::new(&config));
    let report = engine.detect_partitioned(events).await?;
    report.stats.log_summary();

    let mut writer = ResultWriter::new(args.backend, args.output.clone(), &config.window_sizes())?;
    log::info!("📊 Backend: {}", writer.backend_type());

    let written = match writer.write_all(&report.results).await {
        Ok(n) => n,
        Err(e) => {
            log::error!("❌ Failed to write classifications: {}", e);
            return Err(e.into());
        }
    };

    // Post-dedup, sums to `written`
    let count = |t: AttackType| report.results.iter().filter(|r| r.attack_type == t).count();
    log::info!(
        "✅ Scan complete in {:.2}s: {} events, {} candidates, {} rejected, {} written",
        started.elapsed().as_secs_f64(),
        report.stats.events,
        report.stats.total_candidates(),
        report.stats.total_rejected(),
        written
    );
    if report.stats.deduplicated > 0 {
        log::info!("   🧹 {} overlapping results deduplicated", report.stats.deduplicated);
    }
    log::info!(
        "   🥪 fat_sandwich: {} | 🔀 multi_hop_arbitrage: {} | ❓ ambiguous: {}",
        count(AttackType::FatSandwich),
        count(AttackType::MultiHopArbitrage),
        count(AttackType::Ambiguous)
    );

    Ok(())
}
