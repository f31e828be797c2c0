use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DecpError {
    #[error("source file unavailable: {path}: {message}")]
    SourceUnavailable { path: Utf8PathBuf, message: String },

    #[error("malformed input at row {row}, column {column}: {message}")]
    MalformedInput {
        row: usize,
        column: String,
        message: String,
    },

    #[error("column {column} not found in {path}")]
    MissingColumn { column: String, path: Utf8PathBuf },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("DECP request failed: {0}")]
    DecpHttp(String),

    #[error("DECP endpoint returned status {status}: {message}")]
    DecpStatus { status: u16, message: String },

    #[error("Sirene request failed: {0}")]
    SireneHttp(String),

    #[error("Sirene endpoint returned status {status}: {message}")]
    SireneStatus { status: u16, message: String },

    #[error("contours request failed: {0}")]
    ContoursHttp(String),

    #[error("contours endpoint returned status {status}: {message}")]
    ContoursStatus { status: u16, message: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
