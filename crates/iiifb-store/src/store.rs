use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::job::Job;

/// Persisted record of every observed activity. The store is the only source
/// of truth for the watermark; callers never cache it across poll iterations.
#[async_trait]
pub trait ActivityStore: Send + Sync + 'static {
    /// The maximum `activity_end_time` ever stored, or the configured floor
    /// when the table is empty.
    async fn latest_end_time(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Insert a row for a newly observed activity with `started` set to now,
    /// returning the populated job.
    async fn new_activity(
        &self,
        end_time: DateTime<Utc>,
        archival_group_uri: &str,
        activity_type: &str,
    ) -> Result<Job, StoreError>;

    /// Update the mutable post-insertion fields of an existing row.
    async fn save(&self, job: &Job) -> Result<(), StoreError>;

    /// Read one row back by id.
    async fn get(&self, id: i32) -> Result<Option<Job>, StoreError>;
}
