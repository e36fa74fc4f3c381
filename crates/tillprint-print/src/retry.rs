// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy with exponential backoff for failed print submissions.
//
// A failed submission bumps the job's retry count.  Below the limit the job
// either goes straight back to `pending` or is parked in `failed` until its
// backoff (`2^retry_count * base`) has elapsed.  At the limit it is failed
// for good until an operator hits "retry all".

use std::time::Duration;

use chrono::{DateTime, Utc};
use tillprint_core::config::{BackoffAnchor, QueueConfig, RetryMode};
use tillprint_core::types::{JobStatus, PrintJob};

/// Retry configuration, derived from [`QueueConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Failed submissions allowed before giving up.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    pub mode: RetryMode,
    pub anchor: BackoffAnchor,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for RetryPolicy {
    fn from(cfg: &QueueConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: cfg.backoff_base(),
            mode: cfg.retry_mode,
            anchor: cfg.backoff_anchor,
        }
    }
}

/// What to do with a job whose submission just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Back to `pending` for the next processor tick.
    Requeue,
    /// Into `failed`, released by the retry scheduler after backoff.
    Park,
    /// Terminal `failed`.
    GiveUp,
}

impl RetryPolicy {
    /// Decide the fate of a job given its retry count *after* the failure
    /// has been counted.
    pub fn on_failure(&self, retry_count: u32) -> FailureOutcome {
        if retry_count >= self.max_retries {
            FailureOutcome::GiveUp
        } else {
            match self.mode {
                RetryMode::Immediate => FailureOutcome::Requeue,
                RetryMode::Deferred => FailureOutcome::Park,
            }
        }
    }

    /// Required wait before a job with `retry_count` failures becomes eligible again.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        backoff_delay(self.base_delay, retry_count)
    }

    /// Whether the retry scheduler should move this job back to `pending`.
    pub fn is_due(&self, job: &PrintJob, now: DateTime<Utc>) -> bool {
        if job.status != JobStatus::Failed || job.retry_count >= self.max_retries {
            return false;
        }
        let anchor = match self.anchor {
            BackoffAnchor::CreatedAt => job.created_at,
            BackoffAnchor::LastFailure => job.last_failed_at.unwrap_or(job.created_at),
        };
        // A clock that went backwards counts as no time elapsed.
        let elapsed = (now - anchor).to_std().unwrap_or(Duration::ZERO);
        elapsed >= self.backoff_delay(job.retry_count)
    }
}

/// `base * 2^retry_count`, saturating instead of overflowing.
pub fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    base.saturating_mul(1u32 << retry_count.min(20))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tillprint_core::types::{DocumentType, Priority};

    fn failed_job(created_at: DateTime<Utc>, retry_count: u32) -> PrintJob {
        let mut job = PrintJob::new(
            DocumentType::Receipt,
            serde_json::json!({}),
            String::new(),
            Priority::Normal,
            created_at,
        );
        job.status = JobStatus::Failed;
        job.retry_count = retry_count;
        job
    }

    #[test]
    fn backoff_doubles_from_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(20));
    }

    #[test]
    fn backoff_saturates_for_huge_counts() {
        let d = backoff_delay(Duration::from_secs(5), u32::MAX);
        assert!(d >= Duration::from_secs(5 << 20));
    }

    #[test]
    fn failure_outcome_respects_limit_and_mode() {
        let immediate = RetryPolicy::default();
        assert_eq!(immediate.on_failure(1), FailureOutcome::Requeue);
        assert_eq!(immediate.on_failure(2), FailureOutcome::Requeue);
        assert_eq!(immediate.on_failure(3), FailureOutcome::GiveUp);

        let deferred = RetryPolicy {
            mode: RetryMode::Deferred,
            ..Default::default()
        };
        assert_eq!(deferred.on_failure(1), FailureOutcome::Park);
        assert_eq!(deferred.on_failure(3), FailureOutcome::GiveUp);
    }

    #[test]
    fn due_only_after_backoff_from_creation() {
        let policy = RetryPolicy::default();
        let created = Utc::now();
        let job = failed_job(created, 1);

        assert!(!policy.is_due(&job, created + TimeDelta::seconds(9)));
        assert!(policy.is_due(&job, created + TimeDelta::seconds(10)));
    }

    #[test]
    fn exhausted_job_is_never_due() {
        let policy = RetryPolicy::default();
        let created = Utc::now();
        let job = failed_job(created, 3);
        assert!(!policy.is_due(&job, created + TimeDelta::days(1)));
    }

    #[test]
    fn last_failure_anchor_resets_the_wait() {
        let policy = RetryPolicy {
            anchor: BackoffAnchor::LastFailure,
            ..Default::default()
        };
        let created = Utc::now();
        let mut job = failed_job(created, 1);
        job.last_failed_at = Some(created + TimeDelta::seconds(30));

        // Creation-anchored policy would already release it.
        assert!(RetryPolicy::default().is_due(&job, created + TimeDelta::seconds(31)));
        assert!(!policy.is_due(&job, created + TimeDelta::seconds(31)));
        assert!(policy.is_due(&job, created + TimeDelta::seconds(40)));
    }

    #[test]
    fn clock_skew_backwards_is_not_due() {
        let policy = RetryPolicy::default();
        let created = Utc::now();
        let job = failed_job(created, 0);
        assert!(!policy.is_due(&job, created - TimeDelta::seconds(60)));
    }
}
