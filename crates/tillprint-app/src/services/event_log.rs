// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns queue events into log lines for whoever is watching the till.

use std::sync::Arc;
use std::time::Duration;

use tillprint_core::error::TillprintError;
use tillprint_core::human_errors::{Severity, humanize_error};
use tillprint_print::{ChannelObserver, PrintService, QueueEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Background task logging every event a print service publishes.
pub struct EventLog {
    task: JoinHandle<usize>,
}

impl EventLog {
    /// Subscribe to `print` and start logging.  Needs a Tokio runtime.
    pub fn spawn(print: &PrintService) -> Self {
        let (observer, rx) = ChannelObserver::channel();
        print.subscribe(Arc::new(observer));
        Self {
            task: tokio::spawn(log_events(rx)),
        }
    }

    /// Wait for the logger to drain once every handle to the service has
    /// been dropped.  Returns how many events were logged, or `None` if the
    /// channel is still open after `grace`.
    pub async fn finish(self, grace: Duration) -> Option<usize> {
        match tokio::time::timeout(grace, self.task).await {
            Ok(Ok(logged)) => Some(logged),
            Ok(Err(e)) => {
                warn!(error = %e, "event logger task failed");
                None
            }
            Err(_) => {
                warn!("event channel still open at shutdown, later events are not logged");
                None
            }
        }
    }
}

/// Drain the event channel until every sender is gone.
pub async fn log_events(mut rx: mpsc::UnboundedReceiver<QueueEvent>) -> usize {
    let mut logged = 0;
    while let Some(event) = rx.recv().await {
        log_event(&event);
        logged += 1;
    }
    debug!(logged, "event channel closed");
    logged
}

fn log_event(event: &QueueEvent) {
    match event {
        QueueEvent::Enqueued {
            job_id,
            document_type,
            priority,
        } => info!(%job_id, document_type = document_type.as_str(), ?priority, "job queued"),
        QueueEvent::Started { job_id, printer_id } => {
            debug!(%job_id, printer_id = ?printer_id, "printing")
        }
        QueueEvent::Completed { job_id } => info!(%job_id, "printed"),
        QueueEvent::RetryScheduled {
            job_id,
            retry_count,
            error,
        } => warn!(%job_id, retry_count, %error, "print failed, will retry"),
        QueueEvent::Failed { job_id, error } => {
            let human = operator_message(error);
            error!(%job_id, %error, severity = ?human.severity, "{}", human.text)
        }
        QueueEvent::Requeued { job_id, manual } => info!(%job_id, manual, "job requeued"),
        QueueEvent::Cleared { removed } => info!(removed, "queue cleared"),
        QueueEvent::PrinterStatusChanged { printer_id, from, to } => {
            info!(%printer_id, ?from, ?to, "printer status changed")
        }
    }
}

/// Operator-facing line for a terminal print failure.
struct OperatorMessage {
    text: String,
    severity: Severity,
}

/// A `Failed` event means retries are used up, so the job waits for the
/// operator whatever the cause.
fn operator_message(error: &str) -> OperatorMessage {
    let detail = error.strip_prefix("submission failed: ").unwrap_or(error);
    let cause = if error == TillprintError::NoPrinterAvailable.to_string() {
        TillprintError::NoPrinterAvailable
    } else {
        TillprintError::SubmissionFailed(detail.to_owned())
    };

    let human = humanize_error(&cause);
    if human.retriable {
        OperatorMessage {
            text: format!(
                "{} Retries are used up. Tap Retry All or reprint from the sale. (Detail: {detail})",
                human.message
            ),
            severity: Severity::ActionRequired,
        }
    } else {
        OperatorMessage {
            text: format!("{} {}", human.message, human.suggestion),
            severity: human.severity,
        }
    }
}
