// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Trial execution under `perf stat`.
//!
//! Each trial gets its own `run_<index>_<timestamp>` directory holding the raw
//! counter output and a `trial.json` metadata file. Trials run strictly one
//! after another and block until the subprocess exits.

use crate::config::PipelineConfig;
use crate::error::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

const RUN_PREFIX: &str = "run_";

/// Command line of one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl TrialCommand {
    /// `perf stat -e <events> [-p <pids>] -- <server command>`.
    pub fn perf_stat(config: &PipelineConfig, pids: &[u32]) -> Self {
        let mut args = vec!["stat".to_string(), "-e".to_string(), config.events.join(",")];
        if !pids.is_empty() {
            let list: Vec<String> = pids.iter().map(|p| p.to_string()).collect();
            args.push("-p".to_string());
            args.push(list.join(","));
        }
        args.push("--".to_string());
        args.extend(config.server_command.iter().cloned());

        Self {
            program: config.perf_program.clone(),
            args,
            cwd: config.server_dir.clone(),
        }
    }

    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Process discovery and launching.
pub trait ProcessHost {
    /// Pids of processes named exactly `name`.
    fn find_process(&self, name: &str) -> Result<Vec<u32>>;

    /// Run `command` to completion with stdout discarded and stderr written to
    /// `stderr`. Returns the exit code, `None` when killed by a signal.
    fn run(&self, command: &TrialCommand, stderr: File) -> Result<Option<i32>>;
}

/// Host backed by `pgrep` and real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl ProcessHost for SystemHost {
    fn find_process(&self, name: &str) -> Result<Vec<u32>> {
        let output = Command::new("pgrep")
            .args(["-x", name])
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|l| l.trim().parse().ok())
            .collect())
    }

    fn run(&self, command: &TrialCommand, stderr: File) -> Result<Option<i32>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr));
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        let status = cmd.status()?;
        Ok(status.code())
    }
}

/// One executed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub run_index: u32,
    pub created_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    /// Raw `perf stat` output.
    pub artifact: PathBuf,
    /// Server pids collection was scoped to; empty when unscoped.
    pub pids: Vec<u32>,
    pub command: Vec<String>,
    pub exit_code: Option<i32>,
}

impl TrialRecord {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Run index encoded in a `run_<index>_<timestamp>` directory name.
pub fn parse_run_dir_name(name: &str) -> Option<u32> {
    name.strip_prefix(RUN_PREFIX)?.split('_').next()?.parse().ok()
}

/// Executes trials for one sweep directory.
pub struct BenchmarkRunner<H: ProcessHost = SystemHost> {
    config: PipelineConfig,
    sweep_dir: PathBuf,
    host: H,
}

impl BenchmarkRunner<SystemHost> {
    pub fn system(config: PipelineConfig, sweep_dir: PathBuf) -> Self {
        Self::new(config, sweep_dir, SystemHost)
    }
}

impl<H: ProcessHost> BenchmarkRunner<H> {
    pub fn new(config: PipelineConfig, sweep_dir: PathBuf, host: H) -> Self {
        Self {
            config,
            sweep_dir,
            host,
        }
    }

    pub fn sweep_dir(&self) -> &Path {
        &self.sweep_dir
    }

    /// One past the highest run index already present in the sweep directory.
    pub fn next_run_index(&self) -> Result<u32> {
        if !self.sweep_dir.is_dir() {
            return Ok(1);
        }
        let mut highest = 0;
        for entry in fs::read_dir(&self.sweep_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(idx) = entry.file_name().to_str().and_then(parse_run_dir_name) {
                highest = highest.max(idx);
            }
        }
        Ok(highest + 1)
    }

    /// Execute one trial and persist its metadata.
    pub fn run_trial(&self, run_index: u32) -> Result<TrialRecord> {
        let created_at = Utc::now();
        let stamp = created_at.with_timezone(&Local).format("%Y%m%d_%H%M%S");
        let run_dir = self
            .sweep_dir
            .join(format!("{}{}_{}", RUN_PREFIX, run_index, stamp));

        fs::create_dir_all(&self.sweep_dir)?;
        // Fails if the directory exists; a run directory is never reused.
        fs::create_dir(&run_dir)?;

        let pids = match self.host.find_process(&self.config.server_process) {
            Ok(pids) if !pids.is_empty() => {
                debug!(process = %self.config.server_process, ?pids, "scoping collection");
                pids
            }
            Ok(_) => {
                warn!(
                    "{} not running; collecting without -p",
                    self.config.server_process
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "could not look up {}: {}; collecting without -p",
                    self.config.server_process, e
                );
                Vec::new()
            }
        };

        let command = TrialCommand::perf_stat(&self.config, &pids);
        let artifact = run_dir.join(&self.config.artifact_name);
        let sink = File::create(&artifact)?;

        debug!(run = run_index, command = ?command.command_line(), "launching trial");
        let exit_code = self.host.run(&command, sink)?;
        if exit_code != Some(0) {
            warn!(run = run_index, ?exit_code, "trial command exited unsuccessfully");
        }

        let record = TrialRecord {
            run_index,
            created_at,
            run_dir: run_dir.clone(),
            artifact,
            pids,
            command: command.command_line(),
            exit_code,
        };
        record.save(&run_dir.join(&self.config.metadata_name))?;
        info!(run = run_index, dir = %run_dir.display(), "trial complete");

        Ok(record)
    }

    /// Run `count` trials in increasing run-index order.
    pub fn run_sweep(&self, count: u32) -> Result<Vec<TrialRecord>> {
        let first = self.next_run_index()?;
        let mut records = Vec::with_capacity(count as usize);
        for (i, run_index) in (first..first + count).enumerate() {
            info!("run {}/{} (index {})", i + 1, count, run_index);
            records.push(self.run_trial(run_index)?);
        }
        Ok(records)
    }
}
