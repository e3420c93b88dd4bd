// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Pretty-print aggregate statistics, with JSON export.

use crate::error::Result;
use crate::stats::{MetricStats, OperationStats, CACHE_MISS_RATE};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, CellAlignment, Table};
use std::fs;
use std::path::Path;

// ────────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────────

/// Print every operation, metric by metric.
pub fn print_report(stats: &[OperationStats]) {
    if stats.is_empty() {
        println!("{}", "No metric tables found.".yellow());
        return;
    }

    for op in stats {
        println!(
            "\n{}",
            format!("━━━ Operation: {} ━━━", op.operation.to_uppercase()).bold().cyan()
        );
        for metric in &op.metrics {
            println!("{}", format!("-- Metric: {} --", metric_label(&metric.metric)).bold());
            println!("{}", metric_table(metric));
            if let Some(line) = summary_line(metric) {
                println!("{}\n", line.yellow());
            }
        }
    }
}

/// Per-variant `mean ± std` table for one metric.
pub fn metric_table(metric: &MetricStats) -> Table {
    let unit = unit_for(&metric.metric);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Variant", "Runs", "Mean ± Std"]);

    for row in &metric.variants {
        table.add_row(vec![
            Cell::new(row.label.to_uppercase()),
            Cell::new(row.summary.count).set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{} ± {}",
                with_unit(format_number(row.summary.mean), unit),
                with_unit(format_optional(row.summary.std_dev), unit),
            ))
            .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Cross-variant summary line; `None` when there is nothing to summarize.
pub fn summary_line(metric: &MetricStats) -> Option<String> {
    let summary = metric.summary?;
    let unit = unit_for(&metric.metric);
    Some(format!(
        "Summary: mean of means = {}, range = {}, std of means = {}",
        with_unit(format_number(summary.mean_of_means), unit),
        with_unit(format_number(summary.range), unit),
        with_unit(format_optional(summary.std_of_means), unit),
    ))
}

/// Display name of a metric.
pub fn metric_label(metric: &str) -> &str {
    if metric == CACHE_MISS_RATE {
        "cache-miss %"
    } else {
        metric
    }
}

fn unit_for(metric: &str) -> &'static str {
    if metric == CACHE_MISS_RATE {
        "%"
    } else {
        ""
    }
}

fn with_unit(value: String, unit: &str) -> String {
    if value == "n/a" {
        value
    } else {
        format!("{}{}", value, unit)
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// JSON export
// ────────────────────────────────────────────────────────────────────────────────

pub fn export_json(stats: &[OperationStats], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)?;
    println!("  JSON exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────────

/// Two decimals with `,` thousands separators: `1234567.891` → `1,234,567.89`.
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return format!("{}", v);
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn format_optional(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_else(|| "n/a".to_string())
}
