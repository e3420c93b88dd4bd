// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! perf-sweep: measurement pipeline for an external server process.
//!
//! This crate provides:
//! - Workload file summaries (operation counts, implied data volume)
//! - Sequential `perf stat` trials with one isolated directory per run
//! - Table-driven extraction of counters from raw `perf stat` output
//! - Per-variant CSV metric tables keyed by run index
//! - Per-variant and cross-variant statistics with terminal/JSON reporting

pub mod config;
pub mod error;
pub mod extract;
pub mod parser;
pub mod report;
pub mod runner;
pub mod stats;
pub mod store;
pub mod variant;
pub mod workload;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use parser::{CounterSpec, CounterValue, PerfLogParser, PerfMetricSample, ValueKind};
pub use runner::{BenchmarkRunner, ProcessHost, SystemHost, TrialCommand, TrialRecord};
pub use stats::{CrossSummary, OperationStats, Summary};
pub use store::{MetricsStore, MetricsTable};
pub use variant::{BenchmarkVariant, SizeKey};
pub use workload::WorkloadDescriptor;

/// Install the tracing subscriber used by every binary.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects between the `debug`
/// and `info` default filters.
pub fn init_tracing(debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
