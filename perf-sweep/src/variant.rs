// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Benchmark variants and their display ordering.

use crate::error::{PipelineError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

const DIR_PREFIX: &str = "logs_";
const TABLE_SUFFIX: &str = "_metrics.csv";

/// One group of comparable trials: an operation and a size/shape label.
///
/// The operation is the first `_`-separated field of every on-disk name, so it
/// may not contain `_`; the label may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenchmarkVariant {
    pub operation: String,
    pub label: String,
}

impl BenchmarkVariant {
    pub fn new(operation: &str, label: &str) -> Result<Self> {
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        };
        if !valid(operation) || operation.contains('_') || !valid(label) {
            return Err(PipelineError::InvalidVariant(format!("{}_{}", operation, label)));
        }
        Ok(Self {
            operation: operation.to_string(),
            label: label.to_string(),
        })
    }

    /// Sweep directory name: `logs_<operation>_<label>`.
    pub fn dir_name(&self) -> String {
        format!("{}{}_{}", DIR_PREFIX, self.operation, self.label)
    }

    /// Metric table file name: `logs_<operation>_<label>_metrics.csv`.
    pub fn table_file_name(&self) -> String {
        format!("{}{}", self.dir_name(), TABLE_SUFFIX)
    }

    /// Inverse of [`dir_name`](Self::dir_name).
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(DIR_PREFIX)?;
        let (op, label) = rest.split_once('_')?;
        Self::new(op, label).ok()
    }

    /// Inverse of [`table_file_name`](Self::table_file_name).
    pub fn from_table_file_name(name: &str) -> Option<Self> {
        Self::from_dir_name(name.strip_suffix(TABLE_SUFFIX)?)
    }

    pub fn size_key(&self) -> SizeKey {
        SizeKey::parse(&self.label)
    }
}

impl fmt::Display for BenchmarkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation, self.label)
    }
}

/// Sort key for variant labels.
///
/// Numeric labels (`100`, `10k`, `1.5M`) sort by scaled value ahead of every
/// non-numeric label; non-numeric labels sort lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeKey {
    Numeric(f64),
    Named(String),
}

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<num>\d+(?:\.\d+)?)(?P<suffix>[kKmM]?)$").expect("static size pattern")
    })
}

impl SizeKey {
    pub fn parse(label: &str) -> Self {
        let Some(caps) = size_pattern().captures(label) else {
            return SizeKey::Named(label.to_string());
        };
        let num: f64 = match caps["num"].parse() {
            Ok(n) => n,
            Err(_) => return SizeKey::Named(label.to_string()),
        };
        let factor = match &caps["suffix"] {
            "k" | "K" => 1e3,
            "m" | "M" => 1e6,
            _ => 1.0,
        };
        SizeKey::Numeric(num * factor)
    }
}

impl Eq for SizeKey {}

impl Ord for SizeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SizeKey::Numeric(a), SizeKey::Numeric(b)) => a.total_cmp(b),
            (SizeKey::Numeric(_), SizeKey::Named(_)) => Ordering::Less,
            (SizeKey::Named(_), SizeKey::Numeric(_)) => Ordering::Greater,
            (SizeKey::Named(a), SizeKey::Named(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for SizeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort labels into display order, ties broken by the raw label.
pub fn sort_labels<S: AsRef<str>>(labels: &mut [S]) {
    labels.sort_by(|a, b| {
        SizeKey::parse(a.as_ref())
            .cmp(&SizeKey::parse(b.as_ref()))
            .then_with(|| a.as_ref().cmp(b.as_ref()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_label_order() {
        let mut labels = vec!["1m", "100", "10k", "gaussian", "uniform"];
        sort_labels(&mut labels);
        assert_eq!(labels, vec!["100", "10k", "1m", "gaussian", "uniform"]);
    }

    #[test]
    fn test_size_key_scaling() {
        assert_eq!(SizeKey::parse("10k"), SizeKey::Numeric(10_000.0));
        assert_eq!(SizeKey::parse("10K"), SizeKey::Numeric(10_000.0));
        assert_eq!(SizeKey::parse("2M"), SizeKey::Numeric(2_000_000.0));
        assert_eq!(SizeKey::parse("1.5k"), SizeKey::Numeric(1_500.0));
        assert_eq!(SizeKey::parse("750"), SizeKey::Numeric(750.0));
        assert_eq!(SizeKey::parse("10kb"), SizeKey::Named("10kb".into()));
        assert_eq!(SizeKey::parse("zipf"), SizeKey::Named("zipf".into()));
    }

    #[test]
    fn test_equal_scaled_values_keep_stable_order() {
        let mut labels = vec!["1000", "1k"];
        sort_labels(&mut labels);
        assert_eq!(labels, vec!["1000", "1k"]);
    }

    #[test]
    fn test_names_round_trip() {
        let v = BenchmarkVariant::new("range", "big_10k").unwrap();
        assert_eq!(v.dir_name(), "logs_range_big_10k");
        assert_eq!(v.table_file_name(), "logs_range_big_10k_metrics.csv");
        assert_eq!(BenchmarkVariant::from_dir_name("logs_range_big_10k"), Some(v.clone()));
        assert_eq!(
            BenchmarkVariant::from_table_file_name("logs_range_big_10k_metrics.csv"),
            Some(v)
        );
        assert_eq!(BenchmarkVariant::from_dir_name("logs"), None);
        assert_eq!(BenchmarkVariant::from_dir_name("run_1_20250101_000000"), None);
        assert_eq!(BenchmarkVariant::from_table_file_name("logs_get_10k.csv"), None);
    }

    #[test]
    fn test_rejects_invalid_operation() {
        assert!(BenchmarkVariant::new("get_all", "10k").is_err());
        assert!(BenchmarkVariant::new("", "10k").is_err());
        assert!(BenchmarkVariant::new("get", "").is_err());
        assert!(BenchmarkVariant::new("get", "a/b").is_err());
    }
}
