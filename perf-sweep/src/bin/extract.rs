// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! perf-extract: turn every `logs_<op>_<variant>` sweep into a metrics table.

use clap::Parser;
use colored::Colorize;
use perf_sweep::extract::extract_all;
use perf_sweep::{init_tracing, MetricsStore, PipelineConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perf-extract", about = "Extract perf counters from sweep directories", version)]
struct Cli {
    /// Directory containing the sweep directories.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Directory receiving the metric tables (defaults to the root).
    #[arg(long)]
    out: Option<PathBuf>,

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
        config.table_root = root.clone();
        config.log_root = root;
    }
    if let Some(out) = cli.out {
        config.table_root = out;
    }

    let store = MetricsStore::new(config.table_root.clone(), config.table_columns());
    let results = extract_all(&config, &store)?;

    if results.is_empty() {
        let message = format!("No sweep directories under {}", config.log_root.display());
        println!("{}", message.yellow());
    }
    for r in &results {
        let name = r.variant.dir_name();
        match &r.table_path {
            Some(path) => println!(
                "{}: wrote {} runs to {} ({} skipped)",
                name.bold(),
                r.table.len(),
                path.display().to_string().green(),
                r.warnings.len()
            ),
            None => println!("{}: {}", name.bold(), "no table written".red()),
        }
    }

    Ok(())
}
