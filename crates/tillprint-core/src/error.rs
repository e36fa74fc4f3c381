// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tillprint.

use thiserror::Error;

use crate::types::{JobId, PrinterId};

/// Top-level error type for all Tillprint operations.
#[derive(Debug, Error)]
pub enum TillprintError {
    // -- Print errors --
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("no enabled printer available")]
    NoPrinterAvailable,

    #[error("printer not found: {0}")]
    PrinterNotFound(PrinterId),

    #[error("print job not found: {0}")]
    JobNotFound(JobId),

    #[error("print job {0} is currently printing")]
    JobInFlight(JobId),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Runtime --
    #[error("background task failed: {0}")]
    Runtime(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TillprintError>;
