// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Tillprint bill printer queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a configured printer.
///
/// Operators name printers in the config file ("front-counter", "kitchen"),
/// so this is a string rather than a generated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterId(pub String);

impl PrinterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrinterId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PrinterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle states of a print job.
///
/// ```text
/// pending  --(processor picks up)--------------------> printing
/// printing --(success)-------------------------------> completed
/// printing --(failure, retries left, immediate)------> pending
/// printing --(failure, retries left, deferred)-------> failed (awaiting backoff)
/// printing --(failure, retries exhausted)------------> failed
/// failed   --(backoff elapsed | retry-all)-----------> pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting for the processor.
    Pending,
    /// Currently being submitted to a printer.
    Printing,
    /// Successfully printed.
    Completed,
    /// Submission failed; see the job's `error` field.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Kind of document a job prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Receipt,
    Invoice,
    KitchenOrder,
    Label,
    Report,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Invoice => "invoice",
            Self::KitchenOrder => "kitchen_order",
            Self::Label => "label",
            Self::Report => "report",
        }
    }
}

/// Job priority. Informational only: the queue is strictly FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Physical printing technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterType {
    Thermal,
    Inkjet,
    Laser,
    DotMatrix,
}

/// How the printer is attached to the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Usb,
    Network,
    Bluetooth,
}

/// Paper the printer is loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
    /// 58 mm thermal roll.
    Roll58,
    /// 80 mm thermal roll.
    Roll80,
    A4,
    Letter,
}

/// Reported connectivity of a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterStatus {
    Online,
    Offline,
    Error,
}

impl PrinterStatus {
    pub const ALL: [PrinterStatus; 3] = [Self::Online, Self::Offline, Self::Error];
}

/// A printer configured by the store administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub id: PrinterId,
    pub name: String,
    pub printer_type: PrinterType,
    pub connection: ConnectionType,
    pub paper_size: PaperSize,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
    #[serde(default = "offline_until_tested")]
    pub status: PrinterStatus,
    /// Last successful test or print.
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

fn offline_until_tested() -> PrinterStatus {
    PrinterStatus::Offline
}

impl PrinterConfig {
    pub fn new(
        id: impl Into<PrinterId>,
        name: impl Into<String>,
        printer_type: PrinterType,
        connection: ConnectionType,
        paper_size: PaperSize,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            printer_type,
            connection,
            paper_size,
            is_default: false,
            is_enabled: true,
            status: PrinterStatus::Offline,
            last_used: None,
        }
    }
}

/// A single unit of print work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub document_type: DocumentType,
    /// Opaque document data (sale, invoice, kitchen order record, ...).
    pub payload: serde_json::Value,
    /// SHA-256 of the serialized payload, used by the audit trail.
    pub payload_hash: String,
    pub priority: Priority,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Printer the job was (last) submitted to.
    pub printer_id: Option<PrinterId>,
    pub error: Option<String>,
    /// Number of failed submissions since creation or the last manual retry.
    pub retry_count: u32,
    pub last_failed_at: Option<DateTime<Utc>>,
}

impl PrintJob {
    pub fn new(
        document_type: DocumentType,
        payload: serde_json::Value,
        payload_hash: String,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            document_type,
            payload,
            payload_hash,
            priority,
            status: JobStatus::Pending,
            created_at,
            completed_at: None,
            printer_id: None,
            error: None,
            retry_count: 0,
            last_failed_at: None,
        }
    }
}

/// Per-status job counts, for dashboards and log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub printing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.printing + self.completed + self.failed
    }
}
