// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Pipeline configuration.
//!
//! Every stage receives a [`PipelineConfig`] explicitly. Defaults reproduce the
//! standard layout (`./logs`, `workload.txt`, `cargo run --release` against
//! `byron_server`); a TOML file can override any subset of the fields.

use crate::error::Result;
use crate::parser::CounterSpec;
use crate::stats::CACHE_MISS_RATE;
use crate::variant::BenchmarkVariant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Hardware events requested from `perf stat`.
pub const DEFAULT_EVENTS: [&str; 4] =
    ["cycles", "instructions", "cache-references", "cache-misses"];

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of all sweep directories.
    pub log_root: PathBuf,
    /// Directory holding the per-variant metric tables.
    pub table_root: PathBuf,
    /// Workload file summarized before a sweep.
    pub workload_file: PathBuf,
    /// Bytes per stored entry, used for the implied data volume.
    pub entry_size_bytes: u64,
    /// Exact process name looked up to scope collection.
    pub server_process: String,
    /// Command launched under `perf stat` for every trial.
    pub server_command: Vec<String>,
    /// Working directory for the server command.
    pub server_dir: Option<PathBuf>,
    pub perf_program: String,
    pub events: Vec<String>,
    /// File name of the raw counter output inside each run directory.
    pub artifact_name: String,
    /// File name of the trial metadata inside each run directory.
    pub metadata_name: String,
    /// Extractor table; derived from `events` when absent.
    pub counters: Option<Vec<CounterSpec>>,
    /// Metrics printed by the reporter, in order.
    pub report_metrics: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_root: PathBuf::from("logs"),
            table_root: PathBuf::from("logs"),
            workload_file: PathBuf::from("workload.txt"),
            entry_size_bytes: 8,
            server_process: "byron_server".to_string(),
            server_command: vec!["cargo".into(), "run".into(), "--release".into()],
            server_dir: None,
            perf_program: "perf".to_string(),
            events: DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect(),
            artifact_name: "perf.log".to_string(),
            metadata_name: "trial.json".to_string(),
            counters: None,
            report_metrics: default_report_metrics(),
        }
    }
}

fn default_report_metrics() -> Vec<String> {
    [
        "cycles",
        "instructions",
        "cache-references",
        "cache-misses",
        CACHE_MISS_RATE,
        "seconds_time_elapsed",
        "seconds_user",
        "seconds_sys",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_toml(p),
            None => Ok(Self::default()),
        }
    }

    /// Extractor table in effect: explicit `counters`, or one integer spec per
    /// event plus the three timing lines.
    pub fn counter_specs(&self) -> Vec<CounterSpec> {
        match &self.counters {
            Some(specs) => specs.clone(),
            None => CounterSpec::defaults_for(&self.events),
        }
    }

    /// Column order of persisted tables.
    pub fn table_columns(&self) -> Vec<String> {
        self.counter_specs().into_iter().map(|s| s.name).collect()
    }

    /// Directory receiving the trials of one sweep.
    ///
    /// Sweeps without a variant share `<log_root>/logs`.
    pub fn sweep_dir(&self, variant: Option<&BenchmarkVariant>) -> PathBuf {
        match variant {
            Some(v) => self.log_root.join(v.dir_name()),
            None => self.log_root.join("logs"),
        }
    }
}
