// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Extraction stage: sweep directories in, metric tables out.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::parser::PerfLogParser;
use crate::runner::{parse_run_dir_name, TrialRecord};
use crate::store::{MetricsStore, MetricsTable};
use crate::variant::BenchmarkVariant;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of extracting one sweep directory.
#[derive(Debug, Clone)]
pub struct SweepExtraction {
    pub variant: BenchmarkVariant,
    pub sweep_dir: PathBuf,
    pub table: MetricsTable,
    /// Runs excluded from the table, one message each.
    pub warnings: Vec<String>,
    /// Where the table was written; `None` when no run produced a sample.
    pub table_path: Option<PathBuf>,
}

/// `logs_<op>_<label>` directories under `log_root`, sorted by variant.
pub fn discover_sweeps(log_root: &Path) -> Result<Vec<(BenchmarkVariant, PathBuf)>> {
    let mut sweeps = Vec::new();
    for entry in fs::read_dir(log_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(BenchmarkVariant::from_dir_name) {
            Some(variant) => sweeps.push((variant, entry.path())),
            None => debug!(dir = %entry.path().display(), "not a sweep directory"),
        }
    }
    sweeps.sort();
    Ok(sweeps)
}

/// Run directories of one sweep in run-index order.
fn run_dirs(sweep_dir: &Path, warnings: &mut Vec<String>) -> Result<Vec<(u32, PathBuf)>> {
    let mut runs = Vec::new();
    for entry in fs::read_dir(sweep_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !name.starts_with("run_") {
            continue;
        }
        match parse_run_dir_name(&name) {
            Some(idx) => runs.push((idx, entry.path())),
            None => note(
                warnings,
                format!("Unrecognized run directory {}", entry.path().display()),
            ),
        }
    }
    runs.sort();
    Ok(runs)
}

fn note(warnings: &mut Vec<String>, message: String) {
    warn!("{}", message);
    warnings.push(message);
}

/// Parse every trial of one sweep into a table.
pub fn extract_sweep(
    variant: &BenchmarkVariant,
    sweep_dir: &Path,
    parser: &PerfLogParser,
    config: &PipelineConfig,
) -> Result<SweepExtraction> {
    let mut warnings = Vec::new();
    let mut table = MetricsTable::new(config.table_columns());

    for (run, dir) in run_dirs(sweep_dir, &mut warnings)? {
        let artifact = dir.join(&config.artifact_name);
        if !artifact.is_file() {
            note(&mut warnings, format!("No {} found in {}", config.artifact_name, dir.display()));
            continue;
        }

        let metadata = dir.join(&config.metadata_name);
        if let Ok(record) = TrialRecord::load(&metadata) {
            if record.exit_code != Some(0) {
                warn!(
                    run,
                    exit_code = ?record.exit_code,
                    "trial exited unsuccessfully; parsing anyway"
                );
            }
        }

        match parser.parse_file(&artifact, run) {
            Ok(Some(sample)) => {
                if !table.insert(sample) {
                    let message = format!("Duplicate run {} in {}; skipped", run, dir.display());
                    note(&mut warnings, message);
                }
            }
            Ok(None) => note(&mut warnings, format!("No metrics found in {}", artifact.display())),
            Err(e) => note(&mut warnings, format!("Could not read {}: {}", artifact.display(), e)),
        }
    }

    Ok(SweepExtraction {
        variant: variant.clone(),
        sweep_dir: sweep_dir.to_path_buf(),
        table,
        warnings,
        table_path: None,
    })
}

/// Extract every sweep under `config.log_root` and write one table per sweep
/// that yielded at least one sample. Warnings are logged as they occur and
/// also collected on each result.
pub fn extract_all(config: &PipelineConfig, store: &MetricsStore) -> Result<Vec<SweepExtraction>> {
    let parser = PerfLogParser::new(&config.counter_specs())?;
    let mut results = Vec::new();

    for (variant, dir) in discover_sweeps(&config.log_root)? {
        info!("Processing benchmark: {}", variant.dir_name());
        let mut extraction = extract_sweep(&variant, &dir, &parser, config)?;
        if extraction.table.is_empty() {
            note(&mut extraction.warnings, format!("No metrics found for {}", variant.dir_name()));
        } else {
            extraction.table_path = Some(store.save(&variant, &extraction.table)?);
        }
        results.push(extraction);
    }
    Ok(results)
}
