// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! perf-report: per-variant and cross-variant statistics of every metrics table.

use clap::Parser;
use perf_sweep::{init_tracing, report, stats, MetricsStore, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "perf-report", about = "Summarize extracted perf metrics", version)]
struct Cli {
    /// Directory containing the `*_metrics.csv` tables.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Also write the aggregate statistics as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.table_root = root;
    }

    let store = MetricsStore::new(config.table_root.clone(), config.table_columns());
    let mut tables = Vec::new();
    for variant in store.discover()? {
        let table = store.load(&variant)?;
        info!("Loaded {}: {} runs", variant.table_file_name(), table.len());
        tables.push((variant, table));
    }

    let aggregated = stats::aggregate(&tables, &config.report_metrics);
    report::print_report(&aggregated);

    if let Some(path) = cli.json {
        report::export_json(&aggregated, &path)?;
    }

    Ok(())
}
