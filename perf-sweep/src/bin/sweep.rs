// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! perf-sweep: run the server under `perf stat` a fixed number of times.
//!
//! Usage:
//!   perf-sweep 10                              # 10 trials into logs/logs
//!   perf-sweep 10 --op get --variant 10k       # 10 trials into logs/logs_get_10k
//!   perf-sweep 5 --config bench.toml --debug

use clap::Parser;
use colored::Colorize;
use perf_sweep::{
    init_tracing, BenchmarkRunner, BenchmarkVariant, PipelineConfig, WorkloadDescriptor,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perf-sweep", about = "Run repeated perf-stat trials of the server", version)]
struct Cli {
    /// Number of trials to run.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    runs: u32,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Operation label of this sweep (e.g. get, put, range).
    #[arg(long, requires = "variant")]
    op: Option<String>,

    /// Size or shape label of this sweep (e.g. 10k, 1m, uniform).
    #[arg(long, requires = "op")]
    variant: Option<String>,

    /// Override the log root directory.
    #[arg(long)]
    log_root: Option<PathBuf>,

    /// Override the workload file.
    #[arg(long)]
    workload: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(root) = cli.log_root {
        config.log_root = root;
    }
    if let Some(workload) = cli.workload {
        config.workload_file = workload;
    }

    let variant = match (cli.op.as_deref(), cli.variant.as_deref()) {
        (Some(op), Some(label)) => Some(BenchmarkVariant::new(op, label)?),
        _ => None,
    };

    let workload = WorkloadDescriptor::from_path(&config.workload_file, config.entry_size_bytes)?;
    println!("{}", "=== Workload Summary ===".bold().blue());
    println!("{}", workload);
    println!(
        "Running '{}' for {} runs...\n",
        config.server_command.join(" "),
        cli.runs
    );

    let sweep_dir = config.sweep_dir(variant.as_ref());
    let runner = BenchmarkRunner::system(config, sweep_dir);
    println!("Sweep directory: {}", runner.sweep_dir().display());
    let records = runner.run_sweep(cli.runs)?;

    println!("\n{}", "Benchmarking complete. Perf logs by run directory:".bold().green());
    for record in &records {
        println!("  {}", record.run_dir.display());
    }

    Ok(())
}
