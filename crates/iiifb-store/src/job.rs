use chrono::{DateTime, Utc};

/// One row of `archival_group_activity`: the persisted record of a single
/// activity-stream event and its processing outcome.
///
/// A row is created for every activity consumed, regardless of outcome, and
/// is never mutated after reaching a terminal state.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Job {
    pub id: i32,
    pub activity_end_time: DateTime<Utc>,
    pub archival_group_uri: String,
    pub activity_type: String,
    pub id_service_pid: Option<String>,
    pub catalogue_api_uri: Option<String>,
    pub public_manifest_uri: Option<String>,
    pub internal_public_manifest_uri: Option<String>,
    pub internal_api_manifest_uri: Option<String>,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Job {
    /// True once either terminal field is populated.
    pub fn is_terminal(&self) -> bool {
        self.finished.is_some() || self.error_message.is_some()
    }
}
