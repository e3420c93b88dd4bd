// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Extraction of counter values from raw `perf stat` output.
//!
//! The parser is table driven: each [`CounterSpec`] pairs a counter name with
//! a value kind and a regex whose first capture group is the value. Specs are
//! applied independently to the results section, so a missing line only drops
//! that one counter from the sample.

use crate::error::{PipelineError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Header `perf stat` prints before the counter block.
pub const RESULTS_HEADER: &str = "Performance counter stats";

/// Kind of value a counter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
}

/// One row of the extractor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSpec {
    pub name: String,
    pub kind: ValueKind,
    pub pattern: String,
}

impl CounterSpec {
    pub fn new(name: &str, kind: ValueKind, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            pattern: pattern.to_string(),
        }
    }

    /// User-space hardware event, e.g. `12,345,678      cycles:u`.
    pub fn user_event(event: &str) -> Self {
        let pattern = format!(r"(\d[\d,]*)\s+{}:u\b", regex::escape(event));
        Self::new(event, ValueKind::Integer, &pattern)
    }

    /// The three timing lines of the `perf stat` footer.
    pub fn timings() -> Vec<Self> {
        vec![
            Self::new(
                "seconds_time_elapsed",
                ValueKind::Float,
                r"(\d+\.\d+)\s+seconds time elapsed",
            ),
            Self::new("seconds_user", ValueKind::Float, r"(\d+\.\d+)\s+seconds user"),
            Self::new("seconds_sys", ValueKind::Float, r"(\d+\.\d+)\s+seconds sys"),
        ]
    }

    /// One event spec per entry of `events`, followed by the timings.
    pub fn defaults_for<S: AsRef<str>>(events: &[S]) -> Vec<Self> {
        events
            .iter()
            .map(|e| Self::user_event(e.as_ref()))
            .chain(Self::timings())
            .collect()
    }
}

/// A parsed counter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CounterValue {
    Int(u64),
    Float(f64),
}

impl CounterValue {
    pub fn as_f64(self) -> f64 {
        match self {
            CounterValue::Int(v) => v as f64,
            CounterValue::Float(v) => v,
        }
    }

    /// Parse a persisted cell; floats always carry `.`, `e` or a non-finite
    /// marker, everything else must be an unsigned integer.
    pub fn parse_cell(cell: &str) -> Option<Self> {
        let is_float =
            cell.contains(['.', 'e', 'E']) || cell.contains("inf") || cell.contains("NaN");
        if is_float {
            cell.parse().ok().map(CounterValue::Float)
        } else {
            cell.parse().ok().map(CounterValue::Int)
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing `.0` so the kind survives a round trip.
            CounterValue::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Counter values of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfMetricSample {
    pub run: u32,
    pub values: BTreeMap<String, CounterValue>,
}

impl PerfMetricSample {
    pub fn new(run: u32) -> Self {
        Self {
            run,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: CounterValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<CounterValue> {
        self.values.get(name).copied()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).map(CounterValue::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct CompiledCounter {
    name: String,
    kind: ValueKind,
    regex: Regex,
}

/// Compiled extractor table.
pub struct PerfLogParser {
    counters: Vec<CompiledCounter>,
}

impl PerfLogParser {
    pub fn new(specs: &[CounterSpec]) -> Result<Self> {
        let counters = specs
            .iter()
            .map(|spec| {
                let regex = Regex::new(&spec.pattern).map_err(|source| PipelineError::Pattern {
                    name: spec.name.clone(),
                    source,
                })?;
                Ok(CompiledCounter {
                    name: spec.name.clone(),
                    kind: spec.kind,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { counters })
    }

    /// Parser for the four default events and the timings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&CounterSpec::defaults_for(&crate::config::DEFAULT_EVENTS[..]))
    }

    /// Parse raw output. `None` when the results header is absent.
    pub fn parse_str(&self, text: &str, run: u32) -> Option<PerfMetricSample> {
        let start = text.rfind(RESULTS_HEADER)?;
        let section = &text[start..];

        let mut sample = PerfMetricSample::new(run);
        for counter in &self.counters {
            let Some(raw) = counter
                .regex
                .captures(section)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
            else {
                continue;
            };
            let value = match counter.kind {
                ValueKind::Integer => raw.replace(',', "").parse().ok().map(CounterValue::Int),
                ValueKind::Float => raw.parse().ok().map(CounterValue::Float),
            };
            if let Some(value) = value {
                sample.values.insert(counter.name.clone(), value);
            }
        }
        Some(sample)
    }

    /// Parse one trial artifact. The server's own stderr shares the file, so
    /// bytes that are not UTF-8 are replaced rather than rejected.
    pub fn parse_file(&self, path: &Path, run: u32) -> Result<Option<PerfMetricSample>> {
        let bytes = fs::read(path)?;
        Ok(self.parse_str(&String::from_utf8_lossy(&bytes), run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_OUTPUT: &str = r#"
   Compiling byron_server v0.1.0
    Finished `release` profile [optimized] target(s) in 0.05s
     Running `target/release/byron_server`

 Performance counter stats for 'cargo run --release':

     4,913,274,118      cycles:u
    11,204,553,907      instructions:u                   #    2.28  insn per cycle
        48,190,223      cache-references:u
         6,021,847      cache-misses:u                   #   12.50% of all cache refs

       1.523084725 seconds time elapsed

       1.327951000 seconds user
       0.192004000 seconds sys

"#;

    #[test]
    fn test_parse_full_output() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let sample = parser.parse_str(FULL_OUTPUT, 3).unwrap();

        assert_eq!(sample.run, 3);
        assert_eq!(sample.get("cycles"), Some(CounterValue::Int(4_913_274_118)));
        assert_eq!(sample.get("instructions"), Some(CounterValue::Int(11_204_553_907)));
        assert_eq!(sample.get("cache-references"), Some(CounterValue::Int(48_190_223)));
        assert_eq!(sample.get("cache-misses"), Some(CounterValue::Int(6_021_847)));
        assert_eq!(sample.get("seconds_time_elapsed"), Some(CounterValue::Float(1.523084725)));
        assert_eq!(sample.get("seconds_user"), Some(CounterValue::Float(1.327951)));
        assert_eq!(sample.get("seconds_sys"), Some(CounterValue::Float(0.192004)));
        assert_eq!(sample.values.len(), 7);
    }

    #[test]
    fn test_single_counter_only() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let text = " Performance counter stats for 'cargo run --release':\n\n1234567 cycles:u\n";
        let sample = parser.parse_str(text, 1).unwrap();
        assert_eq!(sample.values.len(), 1);
        assert_eq!(sample.get("cycles"), Some(CounterValue::Int(1_234_567)));
    }

    #[test]
    fn test_missing_header_yields_no_sample() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let text = "1234567 cycles:u\n1.0 seconds time elapsed\n";
        assert!(parser.parse_str(text, 1).is_none());
        assert!(parser.parse_str("", 1).is_none());
    }

    #[test]
    fn test_header_without_counters_is_empty_sample() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let sample = parser.parse_str("Performance counter stats for 'x':\n", 2).unwrap();
        assert!(sample.is_empty());
    }

    #[test]
    fn test_not_counted_lines_are_absent() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let text = "Performance counter stats for 'x':\n\
                    <not counted>      cycles:u\n\
                    <not supported>      cache-misses:u\n\
                    900      instructions:u\n";
        let sample = parser.parse_str(text, 1).unwrap();
        assert_eq!(sample.get("cycles"), None);
        assert_eq!(sample.get("cache-misses"), None);
        assert_eq!(sample.get("instructions"), Some(CounterValue::Int(900)));
    }

    #[test]
    fn test_only_last_results_section_counts() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let text = "Performance counter stats for 'a':\n111 cycles:u\n\
                    server log line\n\
                    Performance counter stats for 'b':\n222 instructions:u\n";
        let sample = parser.parse_str(text, 1).unwrap();
        assert_eq!(sample.get("cycles"), None);
        assert_eq!(sample.get("instructions"), Some(CounterValue::Int(222)));
    }

    #[test]
    fn test_kernel_events_not_matched() {
        let parser = PerfLogParser::with_defaults().unwrap();
        let text = "Performance counter stats for 'x':\n500 cycles\n600 cycles:k\n";
        let sample = parser.parse_str(text, 1).unwrap();
        assert!(sample.is_empty());
    }

    #[test]
    fn test_custom_counter_table() {
        let specs = vec![CounterSpec::user_event("branch-misses")];
        let parser = PerfLogParser::new(&specs).unwrap();
        let text = "Performance counter stats for 'x':\n1,024 branch-misses:u\n77 cycles:u\n";
        let sample = parser.parse_str(text, 1).unwrap();
        assert_eq!(sample.values.len(), 1);
        assert_eq!(sample.get("branch-misses"), Some(CounterValue::Int(1024)));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let specs = vec![CounterSpec::new("bad", ValueKind::Integer, "(unclosed")];
        let err = PerfLogParser::new(&specs).err().unwrap();
        assert!(matches!(err, PipelineError::Pattern { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("perf.log");
        std::fs::write(&path, FULL_OUTPUT).unwrap();
        let parser = PerfLogParser::with_defaults().unwrap();
        let sample = parser.parse_file(&path, 9).unwrap().unwrap();
        assert_eq!(sample.run, 9);
        assert_eq!(sample.values.len(), 7);

        assert!(parser.parse_file(&dir.path().join("missing.log"), 1).is_err());
    }

    #[test]
    fn test_parse_file_tolerates_non_utf8_server_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("perf.log");
        let mut bytes = b"server log \xff\xfe\n".to_vec();
        bytes.extend_from_slice(b"Performance counter stats for 'cargo run --release':\n");
        bytes.extend_from_slice(b"     1,000      cycles:u\n");
        std::fs::write(&path, bytes).unwrap();

        let parser = PerfLogParser::with_defaults().unwrap();
        let sample = parser.parse_file(&path, 1).unwrap().unwrap();
        assert_eq!(sample.get("cycles"), Some(CounterValue::Int(1000)));
    }

    #[test]
    fn test_cell_round_trip() {
        let values = [
            CounterValue::Int(0),
            CounterValue::Int(4_913_274_118),
            CounterValue::Float(3.0),
            CounterValue::Float(0.192004),
            CounterValue::Float(1e-7),
        ];
        for v in values {
            assert_eq!(CounterValue::parse_cell(&v.to_string()), Some(v));
        }
        assert_eq!(CounterValue::parse_cell("abc"), None);
        assert_eq!(CounterValue::parse_cell("-5"), None);
    }
}
