// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Workload file summary.
//!
//! A workload file is line oriented; each line starts with a one-character
//! operation code and a space (`p`, `g`, `d`, `r`). Arguments are not
//! interpreted here.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Operation counts and implied data volume of one workload file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkloadDescriptor {
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub ranges: u64,
    /// `puts × entry_size_bytes`.
    pub data_size_bytes: u64,
}

impl WorkloadDescriptor {
    /// Summarize the workload file at `path`.
    pub fn from_path(path: &Path, entry_size_bytes: u64) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), entry_size_bytes)
    }

    /// Summarize workload lines read from `reader`.
    pub fn from_reader<R: BufRead>(reader: R, entry_size_bytes: u64) -> Result<Self> {
        let (mut puts, mut gets, mut deletes, mut ranges) = (0u64, 0u64, 0u64, 0u64);

        // Raw bytes: a line that is not UTF-8 is just another unrecognized line.
        for line in reader.split(b'\n') {
            let line = line?;
            match line.as_slice() {
                [b'p', b' ', ..] => puts += 1,
                [b'g', b' ', ..] => gets += 1,
                [b'd', b' ', ..] => deletes += 1,
                [b'r', b' ', ..] => ranges += 1,
                _ => {}
            }
        }

        Ok(Self {
            puts,
            gets,
            deletes,
            ranges,
            data_size_bytes: puts * entry_size_bytes,
        })
    }

    pub fn total_ops(&self) -> u64 {
        self.puts + self.gets + self.deletes + self.ranges
    }

    pub fn data_size_human(&self) -> String {
        format_iec(self.data_size_bytes)
    }
}

impl fmt::Display for WorkloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "puts: {}", self.puts)?;
        writeln!(f, "gets: {}", self.gets)?;
        writeln!(f, "deletes: {}", self.deletes)?;
        writeln!(f, "ranges: {}", self.ranges)?;
        writeln!(f, "data_size_bytes: {}", self.data_size_bytes)?;
        write!(f, "data_size_hr: {}", self.data_size_human())
    }
}

/// IEC size with a `B` suffix, rounded away from zero (`numfmt --to=iec`).
pub fn format_iec(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["K", "M", "G", "T", "P", "E"];

    if bytes < 1024 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1024.0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value < 10.0 {
        let tenths = (value * 10.0).ceil() / 10.0;
        if tenths >= 10.0 {
            format!("{}{}B", tenths as u64, UNITS[unit])
        } else {
            format!("{:.1}{}B", tenths, UNITS[unit])
        }
    } else {
        let whole = value.ceil();
        if whole >= 1024.0 && unit < UNITS.len() - 1 {
            format!("1.0{}B", UNITS[unit + 1])
        } else {
            format!("{}{}B", whole as u64, UNITS[unit])
        }
    }
}
