//! Job lifecycle: admit, execute, finalize.
//!
//! ```text
//!   PendingJob ──admit──→ RunningJob ──execute──→ ExecutedJob ──finalize──→ JobRecord
//!        │                                 (SUCCESS | FAILED)      (COMPLETE | FAILED)
//!        └──→ Skipped(JobRecord)   lock already held, nothing runs
//! ```
//!
//! Each step consumes the previous state, so a record can only be finalized
//! after it was admitted and executed.
//!
//! Mutual exclusion is bounded by the lock TTL. The lock is never renewed: a
//! job that outlives its TTL keeps running, and another invocation of the
//! same job may be admitted alongside it. Finalize then overwrites the record
//! unconditionally.

use std::sync::Arc;
use std::time::Duration;

use crate::config::LockConfig;
use crate::error::{CronlockError, Result};
use crate::job::{JobRecord, JobStatus};
use crate::store::LockStore;
use crate::worker::ProcessRunner;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn ttl_secs(ttl: Option<Duration>) -> u64 {
    ttl.map_or(0, |ttl| ttl.as_secs())
}

/// A job that has been fingerprinted but not yet admitted.
#[derive(Debug)]
pub struct PendingJob {
    record: JobRecord,
    lock_ttl: Option<Duration>,
}

impl PendingJob {
    pub fn new(args: Vec<String>, lock_ttl: Option<Duration>) -> Result<Self> {
        if args.is_empty() {
            return Err(CronlockError::EmptyCommand);
        }
        Ok(Self {
            record: JobRecord::new(args, now(), ttl_secs(lock_ttl)),
            lock_ttl,
        })
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Try to take the lock by writing the RUNNING record if no record exists.
    pub async fn admit(mut self, store: &dyn LockStore) -> Result<Admission> {
        self.record.started_at = now();
        self.record.status = JobStatus::Running;

        let value = self.record.to_json()?;
        let acquired = store
            .set_if_absent(&self.record.fingerprint, &value, self.lock_ttl)
            .await?;

        if !acquired {
            tracing::info!(fingerprint = %self.record.fingerprint, "Already running, skipping");
            self.record.status = JobStatus::Skipped;
            return Ok(Admission::Skipped(self.record));
        }

        tracing::info!(
            fingerprint = %self.record.fingerprint,
            lock_ttl_secs = self.record.lock_ttl_seconds,
            "Started, locking"
        );
        Ok(Admission::Admitted(RunningJob {
            record: self.record,
        }))
    }
}

#[derive(Debug)]
pub enum Admission {
    Admitted(RunningJob),
    /// Another invocation holds the lock. The record was not persisted.
    Skipped(JobRecord),
}

/// A job holding the lock.
#[derive(Debug)]
pub struct RunningJob {
    record: JobRecord,
}

impl RunningJob {
    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Run the job to completion. A failing job is recorded, not returned as
    /// an error.
    pub async fn execute(mut self, runner: &dyn ProcessRunner) -> ExecutedJob {
        let outcome = runner.run(&self.record.args).await;
        self.record.pid = outcome.pid;

        if outcome.succeeded {
            self.record.status = JobStatus::Success;
        } else {
            self.record.status = JobStatus::Failed;
            self.record.error_message = outcome
                .failure
                .unwrap_or_else(|| "job failed".to_string());
            tracing::warn!(
                fingerprint = %self.record.fingerprint,
                error = %self.record.error_message,
                "Job failed"
            );
        }

        ExecutedJob {
            record: self.record,
        }
    }
}

/// A job whose process has exited but whose record still shows RUNNING in
/// the store.
#[derive(Debug)]
pub struct ExecutedJob {
    record: JobRecord,
}

impl ExecutedJob {
    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Persist the outcome, replacing the lock with the retention TTL.
    pub async fn finalize(
        mut self,
        store: &dyn LockStore,
        retention_ttl: Option<Duration>,
    ) -> Result<JobRecord> {
        self.record.mark_ended(now());
        if self.record.status == JobStatus::Success {
            self.record.status = JobStatus::Complete;
        }
        self.record.retention_ttl_seconds = ttl_secs(retention_ttl);

        let lock_ttl = self.record.lock_ttl_seconds;
        if lock_ttl > 0 && self.record.duration_seconds as u64 >= lock_ttl {
            tracing::warn!(
                fingerprint = %self.record.fingerprint,
                duration_secs = self.record.duration_seconds,
                lock_ttl_secs = lock_ttl,
                "Job outlived its lock; another run may have been admitted"
            );
        }

        let value = self.record.to_json()?;
        store
            .set(&self.record.fingerprint, &value, retention_ttl)
            .await?;
        tracing::debug!(
            fingerprint = %self.record.fingerprint,
            status = %self.record.status,
            "Metadata updated"
        );

        tracing::info!(
            fingerprint = %self.record.fingerprint,
            status = %self.record.status,
            duration_secs = self.record.duration_seconds,
            retention = ?retention_ttl,
            "Finished, unlocking"
        );
        Ok(self.record)
    }
}

/// What happened to an invocation that did not hit a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job ran; the record is COMPLETE or FAILED.
    Finished(JobRecord),
    /// The lock was held elsewhere; nothing ran.
    Skipped(JobRecord),
}

impl JobOutcome {
    pub fn record(&self) -> &JobRecord {
        match self {
            JobOutcome::Finished(record) | JobOutcome::Skipped(record) => record,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, JobOutcome::Skipped(_))
    }
}

/// Drives one invocation through the whole lifecycle.
#[derive(Clone)]
pub struct JobController {
    store: Arc<dyn LockStore>,
    runner: Arc<dyn ProcessRunner>,
    config: LockConfig,
}

impl JobController {
    pub fn new(
        store: Arc<dyn LockStore>,
        runner: Arc<dyn ProcessRunner>,
        config: LockConfig,
    ) -> Self {
        Self {
            store,
            runner,
            config,
        }
    }

    pub async fn run(&self, args: Vec<String>) -> Result<JobOutcome> {
        let job = PendingJob::new(args, self.config.lock_ttl())?;

        match job.admit(self.store.as_ref()).await? {
            Admission::Skipped(record) => Ok(JobOutcome::Skipped(record)),
            Admission::Admitted(running) => {
                let executed = running.execute(self.runner.as_ref()).await;
                let record = executed
                    .finalize(self.store.as_ref(), self.config.retention_ttl())
                    .await?;
                Ok(JobOutcome::Finished(record))
            }
        }
    }
}
