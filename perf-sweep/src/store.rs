// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Per-variant metric tables persisted as CSV.
//!
//! One file per [`BenchmarkVariant`], one row per run. A counter absent from a
//! trial is written as an empty cell and reloads as absent, never as zero.

use crate::error::{PipelineError, Result};
use crate::parser::{CounterValue, PerfMetricSample};
use crate::variant::BenchmarkVariant;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const RUN_COLUMN: &str = "run";

/// Samples of one variant keyed by run index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsTable {
    columns: Vec<String>,
    rows: BTreeMap<u32, PerfMetricSample>,
}

impl MetricsTable {
    /// Empty table persisting `columns` (after `run`) in this order.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Insert a sample. Returns `false` and leaves the table untouched when
    /// its run index is already present.
    pub fn insert(&mut self, sample: PerfMetricSample) -> bool {
        if self.rows.contains_key(&sample.run) {
            return false;
        }
        self.rows.insert(sample.run, sample);
        true
    }

    pub fn get(&self, run: u32) -> Option<&PerfMetricSample> {
        self.rows.get(&run)
    }

    /// Samples in run order.
    pub fn samples(&self) -> impl Iterator<Item = &PerfMetricSample> {
        self.rows.values()
    }

    pub fn runs(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Declared columns followed by any other counter present in a row.
    fn effective_columns(&self) -> Vec<String> {
        let declared: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let extra: BTreeSet<&str> = self
            .rows
            .values()
            .flat_map(|s| s.values.keys().map(String::as_str))
            .filter(|k| !declared.contains(k))
            .collect();
        self.columns
            .iter()
            .cloned()
            .chain(extra.into_iter().map(str::to_string))
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let columns = self.effective_columns();
        let mut wtr = csv::Writer::from_writer(writer);

        wtr.write_record(std::iter::once(RUN_COLUMN).chain(columns.iter().map(String::as_str)))?;
        for sample in self.rows.values() {
            let mut record = Vec::with_capacity(columns.len() + 1);
            record.push(sample.run.to_string());
            for col in &columns {
                record.push(sample.get(col).map(|v| v.to_string()).unwrap_or_default());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a table; `origin` only labels errors.
    pub fn read_csv<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let run_idx = headers
            .iter()
            .position(|h| h == RUN_COLUMN)
            .ok_or_else(|| PipelineError::MissingRunColumn(origin.to_path_buf()))?;
        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != run_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut table = Self::new(columns);
        for record in rdr.records() {
            let record = record?;
            let run_cell = record.get(run_idx).unwrap_or("");
            if run_cell.is_empty() {
                continue;
            }
            let run: u32 = run_cell.parse().map_err(|_| PipelineError::MalformedCell {
                path: origin.to_path_buf(),
                run: run_cell.to_string(),
                column: RUN_COLUMN.to_string(),
                value: run_cell.to_string(),
            })?;

            let mut sample = PerfMetricSample::new(run);
            for (i, header) in headers.iter().enumerate() {
                if i == run_idx {
                    continue;
                }
                let cell = record.get(i).unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                let value =
                    CounterValue::parse_cell(cell).ok_or_else(|| PipelineError::MalformedCell {
                        path: origin.to_path_buf(),
                        run: run_cell.to_string(),
                        column: header.clone(),
                        value: cell.to_string(),
                    })?;
                sample.values.insert(header.clone(), value);
            }

            if !table.insert(sample) {
                return Err(PipelineError::DuplicateRun {
                    variant: origin.display().to_string(),
                    run,
                });
            }
        }
        Ok(table)
    }
}

/// Directory of metric tables, one file per variant.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    root: PathBuf,
    columns: Vec<String>,
}

impl MetricsStore {
    /// Store rooted at `root`; new tables persist `columns` in order.
    pub fn new(root: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            columns,
        }
    }

    pub fn table_path(&self, variant: &BenchmarkVariant) -> PathBuf {
        self.root.join(variant.table_file_name())
    }

    pub fn empty_table(&self) -> MetricsTable {
        MetricsTable::new(self.columns.clone())
    }

    /// Add one sample to the variant's persisted table.
    pub fn append(&self, variant: &BenchmarkVariant, sample: PerfMetricSample) -> Result<()> {
        let path = self.table_path(variant);
        let mut table = if path.exists() {
            self.load(variant)?
        } else {
            self.empty_table()
        };

        let run = sample.run;
        if !table.insert(sample) {
            return Err(PipelineError::DuplicateRun {
                variant: variant.to_string(),
                run,
            });
        }
        self.save(variant, &table)?;
        Ok(())
    }

    /// Replace the variant's table on disk.
    pub fn save(&self, variant: &BenchmarkVariant, table: &MetricsTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.table_path(variant);
        let file = File::create(&path)?;
        table.write_csv(file)?;
        debug!(variant = %variant, rows = table.len(), path = %path.display(), "table written");
        Ok(path)
    }

    pub fn load(&self, variant: &BenchmarkVariant) -> Result<MetricsTable> {
        let path = self.table_path(variant);
        if !path.is_file() {
            return Err(PipelineError::MissingFile(path));
        }
        let file = File::open(&path)?;
        MetricsTable::read_csv(file, &path)
    }

    /// Variants with a table file under the root, sorted.
    pub fn discover(&self) -> Result<Vec<BenchmarkVariant>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut variants = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(v) = entry
                .file_name()
                .to_str()
                .and_then(BenchmarkVariant::from_table_file_name)
            {
                variants.push(v);
            }
        }
        variants.sort();
        Ok(variants)
    }
}
