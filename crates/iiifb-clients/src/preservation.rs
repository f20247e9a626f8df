use std::sync::Arc;

use chrono::{DateTime, Utc};
use iiifb_domain::{Activity, ArchivalGroup};
use iiifb_mets::MetsWrapper;
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::TokenProvider;
use crate::error::ClientError;

/// TLS verification is skipped only for local https endpoints.
pub fn insecure_localhost(uri: &str) -> bool {
    uri.starts_with("https://localhost:")
}

/// Authenticated reads against the preservation repository: the activity
/// stream, archival-group JSON and METS XML.
pub struct PreservationClient {
    client: reqwest::Client,
    token: Arc<dyn TokenProvider>,
    identity_header: String,
    identity_value: String,
}

impl PreservationClient {
    pub fn new(
        client: reqwest::Client,
        token: Arc<dyn TokenProvider>,
        identity_header: impl Into<String>,
        identity_value: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token,
            identity_header: identity_header.into(),
            identity_value: identity_value.into(),
        }
    }

    async fn get(&self, uri: &str) -> Result<reqwest::Response, ClientError> {
        let token = self.token.token().await?;
        let resp = self
            .client
            .get(uri)
            .bearer_auth(&token)
            .header(&self.identity_header, &self.identity_value)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("GET {uri}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "GET {uri}: HTTP status {}",
                status.as_u16()
            )));
        }
        Ok(resp)
    }

    async fn get_json(&self, uri: &str) -> Result<Value, ClientError> {
        self.get(uri)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("GET {uri}: invalid JSON: {e}")))
    }

    /// All activities strictly newer than `since`, collected newest-first by
    /// walking the feed from its last page backwards. A failed walk yields a
    /// short generic error; the next poll retries from the same watermark.
    pub async fn activities(
        &self,
        stream_uri: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Activity>, ClientError> {
        match self.walk_activities(stream_uri, since).await {
            Ok(activities) => Ok(activities),
            Err(e) => {
                error!(error = %e, "Error getting activities");
                Err(ClientError::Transport("Unable to get activities".into()))
            }
        }
    }

    async fn walk_activities(
        &self,
        stream_uri: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Activity>, ClientError> {
        let coll = self.get_json(stream_uri).await?;
        let mut page_uri = coll["last"]["id"].as_str().map(str::to_string);
        let mut activities = Vec::new();

        'pages: while let Some(uri) = page_uri {
            let page = self.get_json(&uri).await?;
            let items = page["orderedItems"].as_array().cloned().unwrap_or_default();
            for item in items.iter().rev() {
                let Some(raw) = item["endTime"].as_str() else {
                    continue;
                };
                let end_time = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| ClientError::Parse(format!("activity endTime '{raw}': {e}")))?
                    .with_timezone(&Utc);
                if end_time <= since {
                    // Pages are time-ordered; everything further back is older.
                    break 'pages;
                }
                activities.push(Activity {
                    end_time,
                    activity_type: item["type"].as_str().unwrap_or_default().to_string(),
                    archival_group_uri: item["object"]["id"].as_str().unwrap_or_default().to_string(),
                });
            }
            page_uri = page["prev"]["id"].as_str().map(str::to_string);
        }

        debug!(count = activities.len(), "Collected activities newer than watermark");
        Ok(activities)
    }

    pub async fn archival_group(&self, uri: &str) -> Result<ArchivalGroup, ClientError> {
        let result: Result<ArchivalGroup, ClientError> = async {
            let value = self.get_json(uri).await?;
            serde_json::from_value(value)
                .map_err(|e| ClientError::Parse(format!("archival group {uri}: {e}")))
        }
        .await;

        result.map_err(|e| {
            error!(error = %e, "Error getting archival group");
            ClientError::Transport("Unable to load Archival Group".into())
        })
    }

    /// Fetch and parse the METS view of an archival group. Construction
    /// failures of the wrapper propagate as a load failure.
    pub async fn mets(&self, archival_group_uri: &str) -> Result<MetsWrapper, ClientError> {
        let uri = format!("{archival_group_uri}?view=mets");
        let result: Result<MetsWrapper, ClientError> = async {
            let text = self
                .get(&uri)
                .await?
                .text()
                .await
                .map_err(|e| ClientError::Transport(format!("GET {uri}: {e}")))?;
            MetsWrapper::from_str(&text).map_err(|e| ClientError::Parse(e.to_string()))
        }
        .await;

        result.map_err(|e| {
            error!(error = %e, "Error getting mets");
            ClientError::Transport("Unable to load Mets".into())
        })
    }
}
