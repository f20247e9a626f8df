use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::job::Job;
use crate::store::ActivityStore;

/// In-memory job store with the same observable behaviour as the Postgres
/// implementation. Used by tests and local experiments.
pub struct InMemoryStore {
    floor: DateTime<Utc>,
    rows: Mutex<Vec<Job>>,
}

impl InMemoryStore {
    pub fn new(floor: DateTime<Utc>) -> Self {
        Self {
            floor,
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every row, in insertion order.
    pub async fn rows(&self) -> Vec<Job> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl ActivityStore for InMemoryStore {
    async fn latest_end_time(&self) -> Result<DateTime<Utc>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .map(|j| j.activity_end_time)
            .max()
            .unwrap_or(self.floor))
    }

    async fn new_activity(
        &self,
        end_time: DateTime<Utc>,
        archival_group_uri: &str,
        activity_type: &str,
    ) -> Result<Job, StoreError> {
        let mut rows = self.rows.lock().await;
        let job = Job {
            id: rows.len() as i32 + 1,
            activity_end_time: end_time,
            archival_group_uri: archival_group_uri.to_string(),
            activity_type: activity_type.to_string(),
            id_service_pid: None,
            catalogue_api_uri: None,
            public_manifest_uri: None,
            internal_public_manifest_uri: None,
            internal_api_manifest_uri: None,
            started: Utc::now(),
            finished: None,
            error_message: None,
        };
        rows.push(job.clone());
        Ok(job)
    }

    async fn save(&self, job: &Job) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or(StoreError::JobNotFound(job.id))?;
        row.id_service_pid = job.id_service_pid.clone();
        row.catalogue_api_uri = job.catalogue_api_uri.clone();
        row.public_manifest_uri = job.public_manifest_uri.clone();
        row.internal_public_manifest_uri = job.internal_public_manifest_uri.clone();
        row.internal_api_manifest_uri = job.internal_api_manifest_uri.clone();
        row.finished = job.finished;
        row.error_message = job.error_message.clone();
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<Job>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|j| j.id == id).cloned())
    }
}
