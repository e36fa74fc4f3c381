// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TillprintError};
use crate::types::PrinterConfig;

/// What a failed submission with retries left turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Straight back to `pending`; the next processor tick picks it up.
    #[default]
    Immediate,
    /// Parked in `failed` until the retry scheduler's backoff elapses.
    Deferred,
}

/// Point in time the retry backoff is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffAnchor {
    /// Job creation time. Repeated failures do not reset the clock.
    #[default]
    CreatedAt,
    /// Most recent failed submission.
    LastFailure,
}

/// Timing and retry knobs for the print queue.
///
/// All periods are whole seconds so the JSON file stays hand-editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Processor tick period.
    pub process_interval_secs: u64,
    /// Retry scheduler tick period.
    pub retry_interval_secs: u64,
    /// Status monitor tick period.
    pub monitor_interval_secs: u64,
    /// Synthetic submission delay of the simulated printer.
    pub print_delay_ms: u64,
    /// Failed submissions allowed before a job is terminally failed.
    pub max_retries: u32,
    /// Backoff base: the wait is `2^retry_count * base`.
    pub backoff_base_secs: u64,
    pub retry_mode: RetryMode,
    pub backoff_anchor: BackoffAnchor,
    /// Chance that the simulated printer rejects a submission.
    pub simulated_failure_rate: f64,
    /// Chance per enabled printer per monitor tick that the demo probe flips its status.
    pub status_flip_probability: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            process_interval_secs: 3,
            retry_interval_secs: 5,
            monitor_interval_secs: 10,
            print_delay_ms: 2000,
            max_retries: 3,
            backoff_base_secs: 5,
            retry_mode: RetryMode::Immediate,
            backoff_anchor: BackoffAnchor::CreatedAt,
            simulated_failure_rate: 0.1,
            status_flip_probability: 0.1,
        }
    }
}

impl QueueConfig {
    pub fn process_interval(&self) -> Duration {
        Duration::from_secs(self.process_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn print_delay(&self) -> Duration {
        Duration::from_millis(self.print_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    /// Reject values that would stall or spin the runner.
    pub fn validate(&self) -> Result<()> {
        if self.process_interval_secs == 0
            || self.retry_interval_secs == 0
            || self.monitor_interval_secs == 0
        {
            return Err(TillprintError::Config("tick intervals must be at least 1 second".into()));
        }
        if self.max_retries == 0 {
            return Err(TillprintError::Config("max_retries must be at least 1".into()));
        }
        for (name, p) in [
            ("simulated_failure_rate", self.simulated_failure_rate),
            ("status_flip_probability", self.status_flip_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(TillprintError::Config(format!("{name} must be within 0..=1, got {p}")));
            }
        }
        Ok(())
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub queue: QueueConfig,
    /// Printers registered at startup.
    pub printers: Vec<PrinterConfig>,
    /// Record job lifecycle events in the audit database.
    pub audit_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            printers: Vec::new(),
            audit_enabled: true,
        }
    }
}
