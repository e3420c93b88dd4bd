// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Error type shared by every pipeline stage.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the measurement pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate run {run} for variant {variant}")]
    DuplicateRun { variant: String, run: u32 },

    #[error("invalid variant name '{0}'")]
    InvalidVariant(String),

    #[error("invalid counter pattern for '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed value '{value}' in {} (run {run}, column {column})", .path.display())]
    MalformedCell {
        path: PathBuf,
        run: String,
        column: String,
        value: String,
    },

    #[error("table {} has no 'run' column", .0.display())]
    MissingRunColumn(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}
