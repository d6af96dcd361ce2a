//! Read-only view over every stored job record, shared by `cronlock list`
//! and the web dashboard.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::job::{JobRecord, JobStatus};
use crate::store::LockStore;

const HUMAN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRow {
    pub fingerprint: String,
    pub status: JobStatus,
    pub started: String,
    pub started_at: i64,
    pub duration_secs: i64,
    pub command: String,
    pub error: String,
}

impl JobRow {
    /// Running jobs show elapsed time so far; finished jobs their recorded
    /// duration.
    pub fn from_record(record: &JobRecord, now: i64) -> Self {
        let duration_secs = match record.status {
            JobStatus::Running => (now - record.started_at).max(0),
            status if status.is_finished() => record.duration_seconds,
            _ => 0,
        };

        Self {
            fingerprint: record.fingerprint.clone(),
            status: record.status,
            started: format_epoch(record.started_at),
            started_at: record.started_at,
            duration_secs,
            command: record.command(),
            error: record.error_message.clone(),
        }
    }
}

fn format_epoch(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|t| t.format(HUMAN_DATE_FORMAT).to_string())
        .unwrap_or_else(|| epoch.to_string())
}

/// Load one record by fingerprint.
pub async fn load_record(store: &dyn LockStore, fingerprint: &str) -> Result<Option<JobRecord>> {
    match store.get(fingerprint).await? {
        Some(value) => Ok(Some(JobRecord::from_json(&value)?)),
        None => Ok(None),
    }
}

/// Every record in the store, newest first. Keys that expire between listing
/// and reading are skipped; an unreadable record is an error.
pub async fn list_jobs(store: &dyn LockStore, now: i64) -> Result<Vec<JobRow>> {
    let keys = store.list_keys("*").await?;
    let mut rows = Vec::with_capacity(keys.len());

    for key in keys {
        match load_record(store, &key).await {
            Ok(Some(record)) => rows.push(JobRow::from_record(&record, now)),
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to read job record");
                return Err(e);
            }
        }
    }

    rows.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    Ok(rows)
}
