// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print submission — the seam between the queue and a printer.
//
// No real device I/O lives here.  `SimulatedSubmitter` stands in for a
// printer with a fixed delay and a configurable rejection rate;
// `ScriptedSubmitter` replays a fixed sequence of outcomes for tests and
// demos.  A hardware backend would implement `PrintSubmitter` with its own
// per-call timeout.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tillprint_core::config::QueueConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{PrintJob, PrinterConfig};
use tracing::debug;

/// Sends one job to one printer.
///
/// `printer` is `None` when no enabled printer exists; implementations
/// should fail the submission rather than guess a device.
#[async_trait]
pub trait PrintSubmitter: Send + Sync {
    async fn submit(&self, job: &PrintJob, printer: Option<&PrinterConfig>) -> Result<()>;
}

fn require_printer(printer: Option<&PrinterConfig>) -> Result<&PrinterConfig> {
    printer.ok_or(TillprintError::NoPrinterAvailable)
}

/// Fake printer: waits a fixed delay, then accepts or rejects at random.
pub struct SimulatedSubmitter {
    delay: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedSubmitter {
    pub fn new(delay: Duration, failure_rate: f64) -> Self {
        Self::with_rng(delay, failure_rate, StdRng::from_os_rng())
    }

    /// Reproducible outcomes for a given seed.
    pub fn seeded(delay: Duration, failure_rate: f64, seed: u64) -> Self {
        Self::with_rng(delay, failure_rate, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(cfg: &QueueConfig) -> Self {
        Self::new(cfg.print_delay(), cfg.simulated_failure_rate)
    }

    fn with_rng(delay: Duration, failure_rate: f64, rng: StdRng) -> Self {
        Self {
            delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PrintSubmitter for SimulatedSubmitter {
    async fn submit(&self, job: &PrintJob, printer: Option<&PrinterConfig>) -> Result<()> {
        let printer = require_printer(printer)?;
        tokio::time::sleep(self.delay).await;

        let rejected = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_bool(self.failure_rate);

        debug!(job_id = %job.id, printer_id = %printer.id, rejected, "simulated submission finished");
        if rejected {
            Err(TillprintError::SubmissionFailed(format!(
                "printer {} did not acknowledge the job",
                printer.id
            )))
        } else {
            Ok(())
        }
    }
}

/// Replays a queue of outcomes; succeeds once the script runs out.
#[derive(Default)]
pub struct ScriptedSubmitter {
    outcomes: Mutex<VecDeque<bool>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSubmitter {
    /// `true` = accepted, `false` = rejected, consumed one per submission.
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every submission is rejected.
    pub fn always_failing(times: usize) -> Self {
        Self::new(std::iter::repeat_n(false, times))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of submissions attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrintSubmitter for ScriptedSubmitter {
    async fn submit(&self, _job: &PrintJob, printer: Option<&PrinterConfig>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        require_printer(printer)?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let accepted = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(true);

        if accepted {
            Ok(())
        } else {
            Err(TillprintError::SubmissionFailed("scripted rejection".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tillprint_core::types::{
        ConnectionType, DocumentType, PaperSize, PrinterType, Priority,
    };

    fn job() -> PrintJob {
        PrintJob::new(
            DocumentType::Receipt,
            serde_json::json!({}),
            String::new(),
            Priority::Normal,
            Utc::now(),
        )
    }

    fn printer() -> PrinterConfig {
        PrinterConfig::new("front", "Front", PrinterType::Thermal, ConnectionType::Usb, PaperSize::Roll80)
    }

    #[tokio::test]
    async fn scripted_outcomes_replay_in_order() {
        let submitter = ScriptedSubmitter::new([false, true]);
        let p = printer();
        assert!(submitter.submit(&job(), Some(&p)).await.is_err());
        assert!(submitter.submit(&job(), Some(&p)).await.is_ok());
        // Script exhausted: success.
        assert!(submitter.submit(&job(), Some(&p)).await.is_ok());
        assert_eq!(submitter.calls(), 3);
    }

    #[tokio::test]
    async fn missing_printer_is_reported_as_such() {
        let submitter = ScriptedSubmitter::default();
        let err = submitter.submit(&job(), None).await.unwrap_err();
        assert!(matches!(err, TillprintError::NoPrinterAvailable));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_submitter_waits_its_delay() {
        let submitter = SimulatedSubmitter::seeded(Duration::from_secs(2), 0.0, 7);
        let start = tokio::time::Instant::now();
        submitter.submit(&job(), Some(&printer())).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_submitter_always_fails_at_rate_one() {
        let submitter = SimulatedSubmitter::seeded(Duration::from_millis(10), 1.0, 7);
        let err = submitter.submit(&job(), Some(&printer())).await.unwrap_err();
        assert!(err.to_string().starts_with("submission failed"));
    }
}
