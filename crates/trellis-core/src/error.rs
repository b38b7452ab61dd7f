//! Build error taxonomy
//!
//! Cache failures are always recoverable and surface as warnings at the
//! call site, so they never appear here. Everything else aborts the build
//! once collected; violations are aggregated per asset and per rule before
//! being surfaced so one attempt reports as many problems as possible.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrellisError {
    /// Structured per-asset parse error; collected across assets before the
    /// build aborts.
    #[error("parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Aggregated failures of one error-enforced rule.
    #[error("rule '{rule_id}' failed:\n{report}")]
    RuleViolations { rule_id: String, report: String },

    /// Filename/id or folder/prefix mismatch. Always fatal, no severity
    /// knob.
    #[error("governance violation: {0}")]
    Governance(String),

    /// Orphaned file, broken cross-reference, ambiguous or shared
    /// ownership. Always fatal.
    #[error("graph integrity failure: {0}")]
    GraphIntegrity(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
