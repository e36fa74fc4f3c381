// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print service — owns the printer registry and the job queue and exposes
// every queue/registry operation plus the three periodic ticks.
//
// Registry and queue share one `std::sync::Mutex`.  It is never held across
// an `.await`: the processor tick marks a job `printing`, drops the lock,
// awaits the submitter, then re-locks to resolve the job.  The `printing`
// status itself is what keeps a second job from starting meanwhile.
// Observers and the audit log are only touched after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tillprint_audit::{AuditEntry, AuditLog, hash_payload};
use tillprint_core::config::QueueConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{
    DocumentType, JobId, PrintJob, PrinterConfig, PrinterId, PrinterStatus, Priority, QueueCounts,
};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::events::{QueueEvent, QueueObserver, dispatch};
use crate::health::{HealthProbe, NoopProbe};
use crate::queue::{PrintQueue, Resolution};
use crate::registry::PrinterRegistry;
use crate::retry::RetryPolicy;
use crate::submit::{PrintSubmitter, SimulatedSubmitter};

struct ServiceState {
    registry: PrinterRegistry,
    queue: PrintQueue,
}

struct Inner {
    state: Mutex<ServiceState>,
    probe: Mutex<Box<dyn HealthProbe>>,
    submitter: Arc<dyn PrintSubmitter>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    policy: RetryPolicy,
    observers: RwLock<Vec<Arc<dyn QueueObserver>>>,
    audit: Option<Mutex<AuditLog>>,
}

/// Shared handle to the print queue and printer registry.
///
/// Cheap to clone; every clone drives the same queue.
#[derive(Clone)]
pub struct PrintService {
    inner: Arc<Inner>,
}

/// Configures a [`PrintService`].  Unset collaborators fall back to the
/// system clock, a [`SimulatedSubmitter`] built from the queue config, and a
/// [`NoopProbe`].
pub struct PrintServiceBuilder {
    config: QueueConfig,
    printers: Vec<PrinterConfig>,
    clock: Option<Arc<dyn Clock>>,
    submitter: Option<Arc<dyn PrintSubmitter>>,
    probe: Option<Box<dyn HealthProbe>>,
    observers: Vec<Arc<dyn QueueObserver>>,
    audit: Option<AuditLog>,
}

impl PrintServiceBuilder {
    pub fn printers(mut self, printers: impl IntoIterator<Item = PrinterConfig>) -> Self {
        self.printers.extend(printers);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn submitter(mut self, submitter: Arc<dyn PrintSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn audit_log(mut self, log: AuditLog) -> Self {
        self.audit = Some(log);
        self
    }

    pub fn build(self) -> Result<PrintService> {
        self.config.validate()?;

        let submitter = self
            .submitter
            .unwrap_or_else(|| Arc::new(SimulatedSubmitter::from_config(&self.config)));
        let registry = PrinterRegistry::with_printers(self.printers);
        info!(
            printers = registry.list().len(),
            audit = self.audit.is_some(),
            "print service ready"
        );

        Ok(PrintService {
            inner: Arc::new(Inner {
                state: Mutex::new(ServiceState {
                    registry,
                    queue: PrintQueue::new(),
                }),
                probe: Mutex::new(self.probe.unwrap_or_else(|| Box::new(NoopProbe))),
                submitter,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                policy: RetryPolicy::from(&self.config),
                config: self.config,
                observers: RwLock::new(self.observers),
                audit: self.audit.map(Mutex::new),
            }),
        })
    }
}

/// Side effects gathered under the state lock and published after it is released.
#[derive(Default)]
struct Effects {
    events: Vec<QueueEvent>,
    audit: Vec<AuditRecord>,
}

struct AuditRecord {
    action: &'static str,
    job_id: Option<JobId>,
    payload_hash: String,
    success: bool,
    details: Option<String>,
}

impl Effects {
    fn event(&mut self, event: QueueEvent) {
        self.events.push(event);
    }

    fn audit(
        &mut self,
        action: &'static str,
        job: Option<(JobId, &str)>,
        success: bool,
        details: Option<String>,
    ) {
        let (job_id, payload_hash) = match job {
            Some((id, hash)) => (Some(id), hash.to_owned()),
            None => (None, String::new()),
        };
        self.audit.push(AuditRecord {
            action,
            job_id,
            payload_hash,
            success,
            details,
        });
    }
}

impl PrintService {
    pub fn builder(config: QueueConfig) -> PrintServiceBuilder {
        PrintServiceBuilder {
            config,
            printers: Vec::new(),
            clock: None,
            submitter: None,
            probe: None,
            observers: Vec::new(),
            audit: None,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Register an observer for all subsequent events.
    pub fn subscribe(&self, observer: Arc<dyn QueueObserver>) {
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, effects: Effects) {
        if let Some(log) = &self.inner.audit {
            let log = log.lock().unwrap_or_else(PoisonError::into_inner);
            for record in &effects.audit {
                if let Err(e) = log.record(
                    record.action,
                    record.job_id.as_ref(),
                    &record.payload_hash,
                    record.success,
                    record.details.as_deref(),
                ) {
                    error!(error = %e, action = record.action, "failed to record audit entry");
                }
            }
        }

        if effects.events.is_empty() {
            return;
        }
        let observers = self
            .inner
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in &effects.events {
            for observer in &observers {
                dispatch(observer.as_ref(), event);
            }
        }
    }

    // -- Printer registry ----------------------------------------------------

    pub fn list_printers(&self) -> Vec<PrinterConfig> {
        self.state().registry.list().to_vec()
    }

    pub fn printer(&self, id: &PrinterId) -> Option<PrinterConfig> {
        self.state().registry.get(id).cloned()
    }

    pub fn default_printer(&self) -> Option<PrinterConfig> {
        self.state().registry.default_printer().cloned()
    }

    /// Register (or replace) a printer.
    pub fn add_printer(&self, printer: PrinterConfig) -> Option<PrinterConfig> {
        self.state().registry.add_printer(printer)
    }

    /// Returns `false` for an unknown printer.
    pub fn set_printer_enabled(&self, id: &PrinterId, enabled: bool) -> bool {
        self.state().registry.set_enabled(id, enabled)
    }

    /// Returns `false` (and changes nothing) for an unknown printer.
    pub fn set_default_printer(&self, id: &PrinterId) -> bool {
        self.state().registry.set_default(id)
    }

    pub fn remove_printer(&self, id: &PrinterId) -> Option<PrinterConfig> {
        self.state().registry.remove_printer(id)
    }

    /// Apply a test-print result to the printer's status.
    pub fn record_test_result(&self, id: &PrinterId, success: bool) {
        let now = self.inner.clock.now();
        let previous = self.state().registry.record_test_result(id, success, now);

        let mut effects = Effects::default();
        if let Some(from) = previous {
            effects.event(QueueEvent::PrinterStatusChanged {
                printer_id: id.clone(),
                from,
                to: if success {
                    PrinterStatus::Online
                } else {
                    PrinterStatus::Error
                },
            });
        }
        self.publish(effects);
    }

    /// Send a test page straight to a printer, bypassing the queue, and
    /// record the outcome.  Returns whether the page was accepted.
    #[instrument(skip(self), fields(printer_id = %id))]
    pub async fn test_printer(&self, id: &PrinterId) -> Result<bool> {
        let printer = self
            .printer(id)
            .ok_or_else(|| TillprintError::PrinterNotFound(id.clone()))?;

        let payload = serde_json::json!({ "test_page": true, "printer": printer.name });
        let hash = hash_payload(&payload);
        let page = PrintJob::new(
            DocumentType::Report,
            payload,
            hash,
            Priority::Low,
            self.inner.clock.now(),
        );

        let success = match self.inner.submitter.submit(&page, Some(&printer)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "test page rejected");
                false
            }
        };
        self.record_test_result(id, success);
        Ok(success)
    }

    // -- Print queue ---------------------------------------------------------

    /// Queue a document for printing.
    pub fn enqueue(
        &self,
        document_type: DocumentType,
        payload: serde_json::Value,
        priority: Priority,
    ) -> JobId {
        let now = self.inner.clock.now();
        let mut effects = Effects::default();
        let id = {
            let mut state = self.state();
            let id = state.queue.enqueue(document_type, payload, priority, now);
            if let Some(job) = state.queue.get(&id) {
                effects.audit(
                    "print_submitted",
                    Some((id, job.payload_hash.as_str())),
                    true,
                    Some(document_type.as_str().to_owned()),
                );
            }
            id
        };
        effects.event(QueueEvent::Enqueued {
            job_id: id,
            document_type,
            priority,
        });
        self.publish(effects);
        id
    }

    /// Snapshot of every job in arrival order.
    pub fn list_jobs(&self) -> Vec<PrintJob> {
        self.state().queue.jobs().to_vec()
    }

    pub fn get_job(&self, id: &JobId) -> Option<PrintJob> {
        self.state().queue.get(id).cloned()
    }

    pub fn counts(&self) -> QueueCounts {
        self.state().queue.counts()
    }

    /// Remove one job that is not currently printing.
    pub fn remove_job(&self, id: &JobId) -> Result<PrintJob> {
        self.state().queue.remove(id)
    }

    /// Empty the queue, in-flight job included.  Returns how many jobs were dropped.
    pub fn clear_queue(&self) -> usize {
        let removed = self.state().queue.clear();
        let mut effects = Effects::default();
        effects.audit("queue_cleared", None, true, Some(format!("{removed} jobs")));
        effects.event(QueueEvent::Cleared { removed });
        self.publish(effects);
        removed
    }

    /// Put every failed job back in line with a fresh retry budget.
    pub fn retry_all_failed(&self) -> usize {
        let mut effects = Effects::default();
        {
            let mut state = self.state();
            let ids = state.queue.retry_all_failed();
            for id in ids {
                if let Some(job) = state.queue.get(&id) {
                    effects.audit(
                        "print_requeued",
                        Some((id, job.payload_hash.as_str())),
                        true,
                        Some("manual".into()),
                    );
                }
                effects.event(QueueEvent::Requeued {
                    job_id: id,
                    manual: true,
                });
            }
        }
        let count = effects.events.len();
        self.publish(effects);
        count
    }

    // -- Periodic ticks ------------------------------------------------------

    /// Processor tick: submit the oldest pending job if nothing is printing.
    ///
    /// Returns the id of the job that was attempted.  The future must be
    /// driven to completion; dropping it mid-submission leaves the job in
    /// `printing` until the queue is cleared.
    #[instrument(skip(self))]
    pub async fn process_tick(&self) -> Option<JobId> {
        let (job, printer) = {
            let mut state = self.state();
            let ServiceState { registry, queue } = &mut *state;
            let job = queue.begin_next(|preferred| registry.select_for_job(preferred))?;
            let printer = job.printer_id.as_ref().and_then(|id| registry.get(id)).cloned();
            (job, printer)
        };

        let mut started = Effects::default();
        started.event(QueueEvent::Started {
            job_id: job.id,
            printer_id: job.printer_id.clone(),
        });
        self.publish(started);

        let outcome = self.inner.submitter.submit(&job, printer.as_ref()).await;
        let now = self.inner.clock.now();
        let error = outcome.err().map(|e| e.to_string());

        let resolution = {
            let mut state = self.state();
            match &error {
                None => {
                    let resolution = state.queue.complete(&job.id, now);
                    if resolution.is_some()
                        && let Some(printer_id) = &job.printer_id
                    {
                        state.registry.mark_used(printer_id, now);
                    }
                    resolution
                }
                Some(message) => {
                    state
                        .queue
                        .fail(&job.id, message.clone(), now, &self.inner.policy)
                }
            }
        };

        let mut effects = Effects::default();
        let job_ref = Some((job.id, job.payload_hash.as_str()));
        match resolution {
            None => debug!(job_id = %job.id, "job cleared while printing, result discarded"),
            Some(Resolution::Completed) => {
                let used = job.printer_id.as_ref().map(ToString::to_string);
                effects.audit("print_completed", job_ref, true, used);
                effects.event(QueueEvent::Completed { job_id: job.id });
            }
            Some(Resolution::Requeued { retry_count }) | Some(Resolution::Parked { retry_count }) => {
                let error = error.unwrap_or_default();
                effects.audit("print_retry", job_ref, false, Some(error.clone()));
                effects.event(QueueEvent::RetryScheduled {
                    job_id: job.id,
                    retry_count,
                    error,
                });
            }
            Some(Resolution::Failed { error, .. }) => {
                effects.audit("print_failed", job_ref, false, Some(error.clone()));
                effects.event(QueueEvent::Failed {
                    job_id: job.id,
                    error,
                });
            }
        }
        self.publish(effects);
        Some(job.id)
    }

    /// Retry scheduler tick: release failed jobs whose backoff has elapsed.
    pub fn retry_tick(&self) -> Vec<JobId> {
        let now = self.inner.clock.now();
        let mut effects = Effects::default();
        let ids = {
            let mut state = self.state();
            let ids = state.queue.requeue_due(now, &self.inner.policy);
            for id in &ids {
                if let Some(job) = state.queue.get(id) {
                    effects.audit(
                        "print_requeued",
                        Some((*id, job.payload_hash.as_str())),
                        true,
                        Some("backoff elapsed".into()),
                    );
                }
                effects.event(QueueEvent::Requeued {
                    job_id: *id,
                    manual: false,
                });
            }
            ids
        };
        if !ids.is_empty() {
            debug!(count = ids.len(), "retry scheduler requeued jobs");
        }
        self.publish(effects);
        ids
    }

    /// Status monitor tick: ask the health probe about every enabled printer.
    /// Returns how many printers changed status.
    pub fn monitor_tick(&self) -> usize {
        let mut effects = Effects::default();
        {
            let mut probe = self.inner.probe.lock().unwrap_or_else(PoisonError::into_inner);
            let mut state = self.state();
            let enabled: Vec<PrinterConfig> = state
                .registry
                .list()
                .iter()
                .filter(|p| p.is_enabled)
                .cloned()
                .collect();

            for printer in &enabled {
                if let Some(status) = probe.probe(printer)
                    && let Some(from) = state.registry.set_status(&printer.id, status)
                {
                    info!(printer_id = %printer.id, from = ?from, to = ?status, "printer status changed");
                    effects.event(QueueEvent::PrinterStatusChanged {
                        printer_id: printer.id.clone(),
                        from,
                        to: status,
                    });
                }
            }
        }
        let changed = effects.events.len();
        self.publish(effects);
        changed
    }

    // -- Audit trail ---------------------------------------------------------

    /// Most recent audit entries, newest first.  Empty when auditing is off.
    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        match &self.inner.audit {
            Some(log) => log.lock().unwrap_or_else(PoisonError::into_inner).recent_entries(limit),
            None => Ok(Vec::new()),
        }
    }

    /// Audit history of one job, oldest first.  Empty when auditing is off.
    pub fn audit_entries_for_job(&self, id: &JobId) -> Result<Vec<AuditEntry>> {
        match &self.inner.audit {
            Some(log) => log.lock().unwrap_or_else(PoisonError::into_inner).entries_for_job(id),
            None => Ok(Vec::new()),
        }
    }
}
