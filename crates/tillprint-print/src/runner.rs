// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background runner — drives the processor, retry scheduler and status
// monitor ticks of a `PrintService` on their own Tokio tasks.
//
// Each loop waits for either its interval or the shutdown signal.  The
// shutdown flag is only looked at between ticks, so a print in flight when
// `stop()` is called finishes and is resolved before the task exits; it is
// never left stuck in `printing`.

use std::future::Future;
use std::time::Duration;

use tillprint_core::error::{Result, TillprintError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::service::PrintService;

/// Lifecycle state of a [`QueueRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    Stopped,
    Running,
}

/// Owns the three periodic tasks of a print service.
pub struct QueueRunner {
    service: PrintService,
    status: RunnerStatus,
    shutdown: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl QueueRunner {
    /// Create a runner in `Stopped` state.
    pub fn new(service: PrintService) -> Self {
        Self {
            service,
            status: RunnerStatus::Stopped,
            shutdown: None,
            tasks: Vec::new(),
        }
    }

    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    pub fn service(&self) -> &PrintService {
        &self.service
    }

    /// Spawn the processor, retry scheduler and status monitor.
    ///
    /// Must be called from within a Tokio runtime.  Calling it while already
    /// running does nothing.
    pub fn start(&mut self) {
        if self.status == RunnerStatus::Running {
            debug!("queue runner already running");
            return;
        }

        let cfg = self.service.config().clone();
        let (tx, rx) = watch::channel(false);

        let svc = self.service.clone();
        self.tasks.push(tokio::spawn(run_every(
            "processor",
            cfg.process_interval(),
            rx.clone(),
            move || {
                let svc = svc.clone();
                async move {
                    svc.process_tick().await;
                }
            },
        )));

        let svc = self.service.clone();
        self.tasks.push(tokio::spawn(run_every(
            "retry_scheduler",
            cfg.retry_interval(),
            rx.clone(),
            move || {
                let svc = svc.clone();
                async move {
                    svc.retry_tick();
                }
            },
        )));

        let svc = self.service.clone();
        self.tasks.push(tokio::spawn(run_every(
            "status_monitor",
            cfg.monitor_interval(),
            rx,
            move || {
                let svc = svc.clone();
                async move {
                    svc.monitor_tick();
                }
            },
        )));

        self.shutdown = Some(tx);
        self.status = RunnerStatus::Running;
        info!(
            process_secs = cfg.process_interval_secs,
            retry_secs = cfg.retry_interval_secs,
            monitor_secs = cfg.monitor_interval_secs,
            "queue runner started"
        );
    }

    /// Signal every loop to exit and wait for them.
    ///
    /// A submission in progress is allowed to finish first.  Every task is
    /// joined and the runner is `Stopped` afterwards even if one of them
    /// panicked; the first such failure is returned.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != RunnerStatus::Running {
            return Ok(());
        }

        info!("stopping queue runner");
        if let Some(tx) = self.shutdown.take() {
            // Receivers only disappear once their task has already exited.
            let _ = tx.send(true);
        }

        let mut first_failure = None;
        for handle in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "runner task ended abnormally");
                first_failure.get_or_insert(TillprintError::Runtime(format!("runner task join: {e}")));
            }
        }

        self.status = RunnerStatus::Stopped;
        info!("queue runner stopped");
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Run `tick` every `period` (first run one period after start) until the
/// shutdown flag flips.  Late ticks are skipped, not bunched up.
async fn run_every<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => tick().await,
        }
    }
    debug!(task = name, "loop exited");
}
