// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Per-variant and cross-variant statistics.

use crate::store::MetricsTable;
use crate::variant::BenchmarkVariant;
use serde::Serialize;
use std::collections::BTreeMap;

/// Derived metric: `cache-misses / cache-references × 100` per row.
pub const CACHE_MISS_RATE: &str = "cache-miss-rate";

const CACHE_MISSES: &str = "cache-misses";
const CACHE_REFERENCES: &str = "cache-references";

/// Mean and sample standard deviation of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// `None` with fewer than two values.
    pub std_dev: Option<f64>,
}

impl Summary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            count: values.len(),
            mean: mean(values),
            std_dev: sample_std_dev(values),
        })
    }
}

/// Summary of per-variant means for one operation and metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossSummary {
    pub variants: usize,
    pub mean_of_means: f64,
    /// `max − min`.
    pub range: f64,
    /// `None` with fewer than two variants.
    pub std_of_means: Option<f64>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with the N−1 divisor.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Values of `metric` for every row that has it, in run order.
///
/// `cache-miss-rate` is derived per row; rows lacking either input or with
/// zero references are skipped.
pub fn series(table: &MetricsTable, metric: &str) -> Vec<f64> {
    if metric == CACHE_MISS_RATE {
        return table
            .samples()
            .filter_map(|s| match (s.get_f64(CACHE_MISSES), s.get_f64(CACHE_REFERENCES)) {
                (Some(misses), Some(refs)) if refs > 0.0 => Some(misses / refs * 100.0),
                _ => None,
            })
            .collect();
    }
    table.samples().filter_map(|s| s.get_f64(metric)).collect()
}

/// Mean and standard deviation of `metric` over `table`.
pub fn summarize(table: &MetricsTable, metric: &str) -> Option<Summary> {
    Summary::from_values(&series(table, metric))
}

/// Mean, range and standard deviation of a set of per-variant means.
pub fn cross_summarize(means: &[f64]) -> Option<CrossSummary> {
    if means.is_empty() {
        return None;
    }
    let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = means.iter().copied().fold(f64::INFINITY, f64::min);
    Some(CrossSummary {
        variants: means.len(),
        mean_of_means: mean(means),
        range: max - min,
        std_of_means: sample_std_dev(means),
    })
}

/// One variant's summary within a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSummary {
    pub label: String,
    pub summary: Summary,
}

/// All variants of one operation for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub metric: String,
    /// Variants with data, in display order.
    pub variants: Vec<VariantSummary>,
    pub summary: Option<CrossSummary>,
}

/// Every reported metric of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    pub operation: String,
    pub metrics: Vec<MetricStats>,
}

/// Group tables by operation and compute every metric in `metrics`.
///
/// Operations come out alphabetically; variants in [`SizeKey`] order.
/// Metrics without any data for an operation are dropped.
///
/// [`SizeKey`]: crate::variant::SizeKey
pub fn aggregate(
    tables: &[(BenchmarkVariant, MetricsTable)],
    metrics: &[String],
) -> Vec<OperationStats> {
    let mut by_op: BTreeMap<&str, Vec<&(BenchmarkVariant, MetricsTable)>> = BTreeMap::new();
    for entry in tables {
        by_op.entry(entry.0.operation.as_str()).or_default().push(entry);
    }

    by_op
        .into_iter()
        .map(|(operation, mut variants)| {
            variants.sort_by(|a, b| {
                a.0.size_key()
                    .cmp(&b.0.size_key())
                    .then_with(|| a.0.label.cmp(&b.0.label))
            });

            let metrics = metrics
                .iter()
                .filter_map(|metric| {
                    let rows: Vec<VariantSummary> = variants
                        .iter()
                        .filter_map(|(variant, table)| {
                            summarize(table, metric).map(|summary| VariantSummary {
                                label: variant.label.clone(),
                                summary,
                            })
                        })
                        .collect();
                    if rows.is_empty() {
                        return None;
                    }
                    let means: Vec<f64> = rows.iter().map(|r| r.summary.mean).collect();
                    Some(MetricStats {
                        metric: metric.clone(),
                        summary: cross_summarize(&means),
                        variants: rows,
                    })
                })
                .collect();

            OperationStats {
                operation: operation.to_string(),
                metrics,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CounterValue, PerfMetricSample};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn table(rows: Vec<PerfMetricSample>) -> MetricsTable {
        let mut t = MetricsTable::new(Vec::new());
        for r in rows {
            assert!(t.insert(r));
        }
        t
    }

    fn cache(run: u32, misses: u64, refs: u64) -> PerfMetricSample {
        PerfMetricSample::new(run)
            .with(CACHE_MISSES, CounterValue::Int(misses))
            .with(CACHE_REFERENCES, CounterValue::Int(refs))
    }

    #[test]
    fn test_cache_miss_rate() {
        let t = table(vec![cache(1, 10, 100), cache(2, 30, 100)]);
        let rates = series(&t, CACHE_MISS_RATE);
        assert_eq!(rates.len(), 2);
        assert!(approx(rates[0], 10.0));
        assert!(approx(rates[1], 30.0));

        let s = summarize(&t, CACHE_MISS_RATE).unwrap();
        assert_eq!(s.count, 2);
        assert!(approx(s.mean, 20.0));
        let sd = s.std_dev.unwrap();
        assert!(sd > 0.0);
        assert!(approx(sd, 200f64.sqrt()));
    }

    #[test]
    fn test_row_missing_references_only_drops_rate() {
        let partial = PerfMetricSample::new(3)
            .with(CACHE_MISSES, CounterValue::Int(50))
            .with("cycles", CounterValue::Int(300));
        let t = table(vec![
            cache(1, 10, 100).with("cycles", CounterValue::Int(100)),
            cache(2, 30, 100).with("cycles", CounterValue::Int(200)),
            partial,
        ]);

        assert_eq!(series(&t, CACHE_MISS_RATE).len(), 2);
        assert_eq!(series(&t, CACHE_MISSES), vec![10.0, 30.0, 50.0]);
        let cycles = summarize(&t, "cycles").unwrap();
        assert_eq!(cycles.count, 3);
        assert!(approx(cycles.mean, 200.0));
    }

    #[test]
    fn test_missing_counter_not_zero_filled() {
        let t = table(vec![
            PerfMetricSample::new(1).with("seconds_user", CounterValue::Float(2.0)),
            PerfMetricSample::new(2),
            PerfMetricSample::new(5).with("seconds_user", CounterValue::Float(4.0)),
        ]);
        let s = summarize(&t, "seconds_user").unwrap();
        assert_eq!(s.count, 2);
        assert!(approx(s.mean, 3.0));
        assert!(summarize(&t, "cycles").is_none());
    }

    #[test]
    fn test_single_value_has_no_std_dev() {
        let t = table(vec![PerfMetricSample::new(1).with("cycles", CounterValue::Int(9))]);
        let s = summarize(&t, "cycles").unwrap();
        assert!(approx(s.mean, 9.0));
        assert_eq!(s.std_dev, None);
    }

    #[test]
    fn test_cross_summary() {
        let c = cross_summarize(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(c.variants, 3);
        assert!(approx(c.mean_of_means, 20.0));
        assert!(approx(c.range, 20.0));
        assert!(approx(c.std_of_means.unwrap(), 10.0));

        let one = cross_summarize(&[7.5]).unwrap();
        assert!(approx(one.range, 0.0));
        assert_eq!(one.std_of_means, None);

        assert!(cross_summarize(&[]).is_none());
    }

    #[test]
    fn test_aggregate_groups_and_orders() {
        let v = |op: &str, label: &str| BenchmarkVariant::new(op, label).unwrap();
        let cyc =
            |run: u32, c: u64| PerfMetricSample::new(run).with("cycles", CounterValue::Int(c));

        let tables = vec![
            (v("get", "uniform"), table(vec![cyc(1, 40)])),
            (v("get", "1m"), table(vec![cyc(1, 30)])),
            (v("put", "10"), table(vec![cyc(1, 5), cyc(2, 7)])),
            (v("get", "100"), table(vec![cyc(1, 10)])),
            (v("get", "10k"), table(vec![cyc(1, 20), PerfMetricSample::new(2)])),
            (v("get", "empty"), table(vec![PerfMetricSample::new(1)])),
        ];
        let metrics = vec!["cycles".to_string(), "instructions".to_string()];
        let stats = aggregate(&tables, &metrics);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].operation, "get");
        assert_eq!(stats[1].operation, "put");

        let get = &stats[0];
        assert_eq!(get.metrics.len(), 1, "instructions has no data");
        let labels: Vec<&str> = get.metrics[0].variants.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["100", "10k", "1m", "uniform"]);

        let cross = get.metrics[0].summary.unwrap();
        assert!(approx(cross.mean_of_means, 25.0));
        assert!(approx(cross.range, 30.0));

        let put = &stats[1].metrics[0];
        assert!(approx(put.variants[0].summary.mean, 6.0));
        assert_eq!(put.summary.unwrap().std_of_means, None);
    }
}
