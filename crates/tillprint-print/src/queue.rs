// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory print job queue.
//
// Jobs are kept in arrival order and stay in the queue after they complete
// or fail until the operator clears it, so the till can always show what
// happened to a receipt.  This type is a pure state machine: it never sleeps,
// never talks to a printer and takes "now" as an argument.  `PrintService`
// drives it.

use chrono::{DateTime, Utc};
use tillprint_audit::hash_payload;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{
    DocumentType, JobId, JobStatus, PrintJob, PrinterId, Priority, QueueCounts,
};
use tracing::{debug, info, instrument, warn};

use crate::retry::{FailureOutcome, RetryPolicy};

/// How a submission attempt left the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Completed,
    /// Failed with retries left; back in `pending`.
    Requeued { retry_count: u32 },
    /// Failed with retries left; parked in `failed` until backoff elapses.
    Parked { retry_count: u32 },
    /// Failed with no retries left.
    Failed { retry_count: u32, error: String },
}

/// FIFO print queue.  Priority is carried on the job but never reorders it.
#[derive(Debug, Default, Clone)]
pub struct PrintQueue {
    jobs: Vec<PrintJob>,
}

impl PrintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new `pending` job and return its id.
    #[instrument(skip_all, fields(document_type = document_type.as_str()))]
    pub fn enqueue(
        &mut self,
        document_type: DocumentType,
        payload: serde_json::Value,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> JobId {
        let payload_hash = hash_payload(&payload);
        let job = PrintJob::new(document_type, payload, payload_hash, priority, now);
        let id = job.id;
        self.jobs.push(job);
        info!(job_id = %id, ?priority, "job enqueued");
        id
    }

    /// All jobs in arrival order.
    pub fn jobs(&self) -> &[PrintJob] {
        &self.jobs
    }

    pub fn get(&self, id: &JobId) -> Option<&PrintJob> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    fn get_mut(&mut self, id: &JobId) -> Option<&mut PrintJob> {
        self.jobs.iter_mut().find(|j| &j.id == id)
    }

    /// The job currently being printed, if any.
    pub fn in_flight(&self) -> Option<&PrintJob> {
        self.jobs.iter().find(|j| j.status == JobStatus::Printing)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Start printing the oldest pending job.
    ///
    /// Returns `None` while another job is printing (one job in flight at a
    /// time) or when nothing is pending.  `select_printer` receives the job's
    /// previously assigned printer and returns the printer to use now.
    pub fn begin_next(
        &mut self,
        select_printer: impl FnOnce(Option<&PrinterId>) -> Option<PrinterId>,
    ) -> Option<PrintJob> {
        if let Some(busy) = self.in_flight() {
            debug!(job_id = %busy.id, "printer busy, skipping tick");
            return None;
        }

        let job = self.jobs.iter_mut().find(|j| j.status == JobStatus::Pending)?;
        job.printer_id = select_printer(job.printer_id.as_ref());
        job.status = JobStatus::Printing;
        debug!(job_id = %job.id, printer_id = ?job.printer_id, "job printing");
        Some(job.clone())
    }

    /// Mark a printing job as completed.
    ///
    /// Returns `None` if the job is gone (queue cleared mid-print) or is not
    /// printing; the late result is then dropped.
    pub fn complete(&mut self, id: &JobId, now: DateTime<Utc>) -> Option<Resolution> {
        let job = self.printing_job(id)?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(now);
        job.error = None;
        info!(job_id = %id, "job completed");
        Some(Resolution::Completed)
    }

    /// Record a failed submission and apply the retry policy.
    ///
    /// Same `None` semantics as [`complete`](Self::complete).
    pub fn fail(
        &mut self,
        id: &JobId,
        error: String,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Option<Resolution> {
        let job = self.printing_job(id)?;
        job.retry_count += 1;
        job.last_failed_at = Some(now);

        let resolution = match policy.on_failure(job.retry_count) {
            FailureOutcome::Requeue => {
                job.status = JobStatus::Pending;
                job.error = Some(error);
                Resolution::Requeued {
                    retry_count: job.retry_count,
                }
            }
            FailureOutcome::Park => {
                job.status = JobStatus::Failed;
                job.error = Some(error);
                Resolution::Parked {
                    retry_count: job.retry_count,
                }
            }
            FailureOutcome::GiveUp => {
                job.status = JobStatus::Failed;
                job.error = Some(error.clone());
                Resolution::Failed {
                    retry_count: job.retry_count,
                    error,
                }
            }
        };

        warn!(job_id = %id, retry_count = job.retry_count, status = job.status.as_str(), "print submission failed");
        Some(resolution)
    }

    fn printing_job(&mut self, id: &JobId) -> Option<&mut PrintJob> {
        match self.get_mut(id) {
            Some(job) if job.status == JobStatus::Printing => Some(job),
            Some(job) => {
                debug!(job_id = %id, status = job.status.as_str(), "result for job that is no longer printing dropped");
                None
            }
            None => {
                debug!(job_id = %id, "result for cleared job dropped");
                None
            }
        }
    }

    /// Retry scheduler pass: move every failed job whose backoff has elapsed
    /// back to `pending`.  Exhausted jobs are left alone.
    pub fn requeue_due(&mut self, now: DateTime<Utc>, policy: &RetryPolicy) -> Vec<JobId> {
        let mut requeued = Vec::new();
        for job in self.jobs.iter_mut().filter(|j| policy.is_due(j, now)) {
            job.status = JobStatus::Pending;
            requeued.push(job.id);
            debug!(job_id = %job.id, retry_count = job.retry_count, "backoff elapsed, job requeued");
        }
        requeued
    }

    /// Operator override: every failed job back to `pending` with a clean
    /// retry count, ignoring backoff.
    pub fn retry_all_failed(&mut self) -> Vec<JobId> {
        let mut requeued = Vec::new();
        for job in self.jobs.iter_mut().filter(|j| j.status == JobStatus::Failed) {
            job.status = JobStatus::Pending;
            job.retry_count = 0;
            job.error = None;
            job.last_failed_at = None;
            requeued.push(job.id);
        }
        info!(count = requeued.len(), "failed jobs requeued by operator");
        requeued
    }

    /// Drop every job, including one that is printing.  Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.jobs.len();
        self.jobs.clear();
        info!(removed, "queue cleared");
        removed
    }

    /// Remove a single job that is not currently printing.
    pub fn remove(&mut self, id: &JobId) -> Result<PrintJob> {
        let index = self
            .jobs
            .iter()
            .position(|j| &j.id == id)
            .ok_or(TillprintError::JobNotFound(*id))?;
        if self.jobs[index].status == JobStatus::Printing {
            return Err(TillprintError::JobInFlight(*id));
        }
        Ok(self.jobs.remove(index))
    }

    pub fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Printing => counts.printing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tillprint_core::config::RetryMode;

    fn receipt(queue: &mut PrintQueue, now: DateTime<Utc>) -> JobId {
        queue.enqueue(
            DocumentType::Receipt,
            serde_json::json!({"sale_id": 42, "total": 9.99}),
            Priority::Normal,
            now,
        )
    }

    fn front() -> Option<PrinterId> {
        Some(PrinterId::new("front"))
    }

    #[test]
    fn enqueue_creates_pending_job_with_hash() {
        let mut queue = PrintQueue::new();
        let id = receipt(&mut queue, Utc::now());

        let job = queue.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.payload_hash.len(), 64);
    }

    #[test]
    fn begin_next_is_fifo_regardless_of_priority() {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let low = queue.enqueue(DocumentType::Report, serde_json::json!({}), Priority::Low, now);
        let _high = queue.enqueue(DocumentType::Invoice, serde_json::json!({}), Priority::High, now);

        let job = queue.begin_next(|_| front()).unwrap();
        assert_eq!(job.id, low);
        assert_eq!(job.status, JobStatus::Printing);
        assert_eq!(job.printer_id, front());
    }

    #[test]
    fn only_one_job_prints_at_a_time() {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let first = receipt(&mut queue, now);
        receipt(&mut queue, now);

        assert!(queue.begin_next(|_| front()).is_some());
        assert!(queue.begin_next(|_| front()).is_none());
        assert_eq!(queue.counts().printing, 1);

        queue.complete(&first, now);
        assert!(queue.begin_next(|_| front()).is_some());
        assert_eq!(queue.counts().printing, 1);
    }

    #[test]
    fn complete_sets_timestamp() {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);
        queue.begin_next(|_| front());

        let later = now + TimeDelta::seconds(2);
        assert_eq!(queue.complete(&id, later), Some(Resolution::Completed));
        let job = queue.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(later));
    }

    #[test]
    fn three_failures_exhaust_retries() {
        let policy = RetryPolicy::default();
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);

        for expected in 1..=2 {
            queue.begin_next(|_| front()).unwrap();
            let res = queue.fail(&id, "submission failed".into(), now, &policy);
            assert_eq!(res, Some(Resolution::Requeued { retry_count: expected }));
            assert_eq!(queue.get(&id).unwrap().status, JobStatus::Pending);
        }

        queue.begin_next(|_| front()).unwrap();
        let res = queue.fail(&id, "submission failed".into(), now, &policy);
        assert_eq!(
            res,
            Some(Resolution::Failed {
                retry_count: 3,
                error: "submission failed".into()
            })
        );
        let job = queue.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 3);
        assert_eq!(job.error.as_deref(), Some("submission failed"));
    }

    #[test]
    fn exhausted_job_is_not_requeued_by_scheduler() {
        let policy = RetryPolicy::default();
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);
        for _ in 0..3 {
            queue.begin_next(|_| front());
            queue.fail(&id, "x".into(), now, &policy);
        }

        assert!(queue.requeue_due(now + TimeDelta::days(7), &policy).is_empty());
        assert_eq!(queue.get(&id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn deferred_mode_parks_until_backoff() {
        let policy = RetryPolicy {
            mode: RetryMode::Deferred,
            ..Default::default()
        };
        let mut queue = PrintQueue::new();
        let created = Utc::now();
        let id = receipt(&mut queue, created);

        queue.begin_next(|_| front());
        assert_eq!(
            queue.fail(&id, "x".into(), created, &policy),
            Some(Resolution::Parked { retry_count: 1 })
        );
        assert_eq!(queue.get(&id).unwrap().status, JobStatus::Failed);
        assert!(queue.begin_next(|_| front()).is_none());

        // retry_count 1 -> 10s backoff measured from creation.
        assert!(queue.requeue_due(created + TimeDelta::seconds(9), &policy).is_empty());
        assert_eq!(queue.requeue_due(created + TimeDelta::seconds(10), &policy), vec![id]);
        let job = queue.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
    }

    #[test]
    fn retry_all_failed_resets_everything() {
        let policy = RetryPolicy::default();
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);
        for _ in 0..3 {
            queue.begin_next(|_| front());
            queue.fail(&id, "x".into(), now, &policy);
        }

        assert_eq!(queue.retry_all_failed(), vec![id]);
        let job = queue.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.error.is_none());
    }

    #[test]
    fn clear_drops_in_flight_and_late_results() {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);
        receipt(&mut queue, now);
        queue.begin_next(|_| front());

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.complete(&id, now), None);
        assert_eq!(queue.fail(&id, "x".into(), now, &RetryPolicy::default()), None);
    }

    #[test]
    fn remove_refuses_in_flight_job() {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let printing = receipt(&mut queue, now);
        let waiting = receipt(&mut queue, now);
        queue.begin_next(|_| front());

        assert!(matches!(
            queue.remove(&printing),
            Err(TillprintError::JobInFlight(_))
        ));
        assert_eq!(queue.remove(&waiting).unwrap().id, waiting);
        assert!(matches!(
            queue.remove(&waiting),
            Err(TillprintError::JobNotFound(_))
        ));
    }

    #[test]
    fn requeue_keeps_previous_printer_as_preference() {
        let policy = RetryPolicy::default();
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        let id = receipt(&mut queue, now);

        queue.begin_next(|_| Some(PrinterId::new("kitchen")));
        queue.fail(&id, "x".into(), now, &policy);

        let mut seen = None;
        queue.begin_next(|preferred| {
            seen = preferred.cloned();
            preferred.cloned()
        });
        assert_eq!(seen, Some(PrinterId::new("kitchen")));
    }
}
