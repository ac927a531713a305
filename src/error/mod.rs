//! Error types and handling for `ghist`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration at the CLI boundary
//! - Provides recovery hints for user-facing errors
//!
//! Transient remote conditions (rate limits, 5xx) are retried inside the
//! transport layer and never reach this enum unless retries are exhausted.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `ghist` operations.
#[derive(Error, Debug)]
pub enum GhistError {
    // === Storage Errors ===
    /// Database file already exists (refusing to re-initialize).
    #[error("Database already exists at '{path}'")]
    DatabaseExists { path: PathBuf },

    /// Database file not found at the specified path.
    #[error("Database not found at '{path}'")]
    DatabaseNotFound { path: PathBuf },

    /// Project already tracked in the database.
    #[error("Project already stored in database: {name}")]
    ProjectExists { name: String },

    /// Project is not tracked in the database.
    #[error("Unknown project: {name}")]
    ProjectNotFound { name: String },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Remote Errors ===
    /// No authentication token could be found.
    #[error("No GitHub token configured")]
    MissingToken,

    /// Non-recoverable HTTP status from the remote API.
    #[error("HTTP {status} from {url}\n{body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// Transient failures (5xx) exceeded the retry budget.
    #[error("Giving up on {url} after repeated HTTP {status}")]
    RetriesExhausted { url: String, status: u16 },

    /// Error message embedded in an otherwise successful API reply.
    #[error("API error: {message}")]
    Api { message: String },

    /// Network-level transport failure (DNS, TLS, connect).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A remote payload was missing a required field or failed to parse.
    #[error("Malformed remote payload: {reason}")]
    Payload { reason: String },

    // === Edit Errors ===
    /// An edited text buffer contained an unrecognized header line.
    #[error("Unknown summary line: {line}")]
    UnknownHeader { line: String },

    /// A bulk edit buffer had no issue list after the bulk sentinel.
    #[error("Cannot find bulk edit issue list")]
    NoBulkList,

    /// A search or selection matched no issues.
    #[error("No issues matched")]
    NoMatches,

    /// Every step of a multi-step edit apply failed.
    #[error("Edit failed:\n{report}")]
    EditFailed { report: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GhistError {
    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseNotFound { .. } => Some("Run: ghist init"),
            Self::DatabaseExists { .. } => Some("Remove the file to start over"),
            Self::ProjectNotFound { .. } => Some("Run: ghist add <owner/repo>"),
            Self::MissingToken => {
                Some("Set GITHUB_TOKEN or write a personal access token to the token file")
            }
            Self::UnknownHeader { .. } => {
                Some("Only Title/State/Assignee/Closed/Labels/Milestone/URL/Reactions headers are recognized")
            }
            _ => None,
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type using `GhistError`.
pub type Result<T> = std::result::Result<T, GhistError>;
