// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue events and the observer interface the print service emits them through.

use tillprint_core::types::{DocumentType, JobId, PrinterId, PrinterStatus, Priority};
use tokio::sync::mpsc;

/// Something observable happened in the queue or registry.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued {
        job_id: JobId,
        document_type: DocumentType,
        priority: Priority,
    },
    /// Processor picked the job up and is submitting it.
    Started {
        job_id: JobId,
        printer_id: Option<PrinterId>,
    },
    Completed {
        job_id: JobId,
    },
    /// Submission failed but the job will be retried.
    RetryScheduled {
        job_id: JobId,
        retry_count: u32,
        error: String,
    },
    /// Submission failed and retries are exhausted.
    Failed {
        job_id: JobId,
        error: String,
    },
    /// A failed job went back to `pending`, by backoff or by operator.
    Requeued {
        job_id: JobId,
        manual: bool,
    },
    Cleared {
        removed: usize,
    },
    PrinterStatusChanged {
        printer_id: PrinterId,
        from: PrinterStatus,
        to: PrinterStatus,
    },
}

/// Receives queue notifications.
///
/// Called after the service has released its state lock, so implementations
/// may call back into the service.  Keep them quick: they run on the tick
/// that produced the event.
pub trait QueueObserver: Send + Sync {
    /// Once per job transition into `completed`.
    fn on_print_complete(&self, _job_id: JobId) {}

    /// Once per job transition into terminal `failed`.
    fn on_print_error(&self, _job_id: JobId, _error: &str) {}

    /// Every event, including the two above.
    fn on_event(&self, _event: &QueueEvent) {}
}

/// Route an event to the matching observer callbacks.
pub(crate) fn dispatch(observer: &dyn QueueObserver, event: &QueueEvent) {
    match event {
        QueueEvent::Completed { job_id } => observer.on_print_complete(*job_id),
        QueueEvent::Failed { job_id, error } => observer.on_print_error(*job_id, error),
        _ => {}
    }
    observer.on_event(event);
}

/// Forwards every event into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<QueueEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl QueueObserver for ChannelObserver {
    fn on_event(&self, event: &QueueEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}
