use std::collections::HashMap;

use iiifb_domain::{InternalUris, ResolvedIdentity};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::ClientError;

/// Static configuration for the identity resolver, injected at startup.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_header: String,
    pub api_key: String,
    /// Rewrites of the last-two path segments, keyed by the penultimate
    /// segment. Dev/test only.
    pub container_aliases: HashMap<String, String>,
    /// Host rewrites; a match also drops any explicit port. Dev/test only.
    pub host_aliases: HashMap<String, String>,
    /// Public prefix stripped from the returned manifest URI when building
    /// internal cloud-service URIs.
    pub rewritten_public_prefix: String,
    pub presentation_host: String,
    pub customer_id: u32,
}

/// Archival-group URI → stable identity, plus synthesis of the internal
/// IIIF cloud service URIs.
pub struct IdentityResolver {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl IdentityResolver {
    pub fn new(client: reqwest::Client, config: IdentityConfig) -> Self {
        Self { client, config }
    }

    /// Rewrite an archival-group URI for environments where the identity
    /// service was seeded with different public URIs. Container alias first,
    /// then host alias; an unparseable URI passes through untouched.
    pub fn mutate(&self, archival_group_uri: &str) -> String {
        let Ok(parsed) = Url::parse(archival_group_uri) else {
            return archival_group_uri.to_string();
        };

        let mut uri = archival_group_uri.to_string();

        let path = parsed.path().trim_start_matches('/');
        let path = path.strip_prefix("repository/").unwrap_or(path);
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() >= 2 {
            let container = parts[parts.len() - 2];
            if let Some(alias) = self.config.container_aliases.get(container) {
                let old_end = format!("{}/{}", container, parts[parts.len() - 1]);
                let new_end = format!("{}/{}", alias, parts[parts.len() - 1]);
                if let Some(stem) = uri.strip_suffix(&old_end) {
                    uri = format!("{stem}{new_end}");
                }
            }
        }

        if let Some(host) = parsed.host_str() {
            if let Some(alias) = self.config.host_aliases.get(host) {
                uri = uri.replace(host, alias);
                if let Some(port) = parsed.port() {
                    uri = uri.replace(&format!(":{port}"), "");
                }
            }
        }

        uri
    }

    /// Query the identity service; exactly one match is required.
    pub async fn resolve(&self, archival_group_uri: &str) -> Result<ResolvedIdentity, ClientError> {
        let for_query = self.mutate(archival_group_uri);
        debug!(query = %for_query, "Querying identity service");

        let url = format!("{}/ids", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[("q", for_query.as_str()), ("s", "repositoryuri")])
            .header(&self.config.api_header, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("identity service request: {e}")))?;

        let status = resp.status();
        if status.as_u16() != 200 {
            return Err(ClientError::Transport(format!(
                "Identity service returned HTTP status {}",
                status.as_u16()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("identity service response: {e}")))?;
        let results = body["results"].as_array().cloned().unwrap_or_default();

        if results.is_empty() {
            return Err(ClientError::Ambiguous("No results found".into()));
        }
        if results.len() > 1 {
            return Err(ClientError::Ambiguous("Multiple results found".into()));
        }

        let result = &results[0];
        let pid = result["id"]
            .as_str()
            .ok_or_else(|| ClientError::Parse("identity result has no id".into()))?
            .to_string();
        let manifest_uri = result["manifesturi"]
            .as_str()
            .ok_or_else(|| ClientError::Parse("identity result has no manifesturi".into()))?
            .to_string();

        Ok(ResolvedIdentity {
            pid,
            manifest_uri,
            catalogue_api_uri: opt_string(&result["catalogueapiuri"]),
            catirn: opt_string(&result["catirn"]),
        })
    }

    /// Downstream URIs for a resolved identity. The identity service only
    /// knows the rewritten public URI; everything internal hangs off the
    /// cloud-service host, customer id and pid.
    pub fn internal_uris(&self, pid: &str, manifest_uri: &str) -> InternalUris {
        let path_part = manifest_uri
            .strip_prefix(&self.config.rewritten_public_prefix)
            .unwrap_or(manifest_uri);
        let base = format!(
            "{}/{}",
            self.config.presentation_host.trim_end_matches('/'),
            self.config.customer_id
        );
        InternalUris {
            public_manifest_uri: format!("{base}/{}", path_part.trim_start_matches('/')),
            api_manifest_uri: format!("{base}/manifests/{pid}"),
            canvas_id_prefix: format!("{base}/canvases/{pid}_"),
            asset_prefix: format!("{pid}_"),
        }
    }
}

fn opt_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
