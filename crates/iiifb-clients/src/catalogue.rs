use serde_json::Value;
use tracing::error;

use crate::error::ClientError;

/// Fetch of descriptive metadata for one catalogued object.
pub struct CatalogueClient {
    client: reqwest::Client,
    key_header: String,
    key_value: String,
}

impl CatalogueClient {
    pub fn new(
        client: reqwest::Client,
        key_header: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            client,
            key_header: key_header.into(),
            key_value: key_value.into(),
        }
    }

    pub async fn read(&self, catalogue_api_uri: &str) -> Result<Value, ClientError> {
        let resp = self
            .client
            .get(catalogue_api_uri)
            .header(&self.key_header, &self.key_value)
            .send()
            .await
            .map_err(|e| {
                error!(uri = catalogue_api_uri, error = %e, "Catalogue API request failed");
                ClientError::Transport("Unable to reach Catalogue API".into())
            })?;

        let status = resp.status().as_u16();
        if status == 200 {
            return resp
                .json()
                .await
                .map_err(|e| ClientError::Parse(format!("Catalogue API returned invalid JSON: {e}")));
        }

        // Non-200: the body may carry a JSON error field worth surfacing.
        let detail = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body["error"].as_str().map(str::to_string));
        match detail {
            Some(detail) => Err(ClientError::Transport(format!(
                "Catalogue API returned HTTP status {status}: {detail}"
            ))),
            None => Err(ClientError::Transport(format!(
                "Catalogue API returned HTTP status {status}"
            ))),
        }
    }
}
