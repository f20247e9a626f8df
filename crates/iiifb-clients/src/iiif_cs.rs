use std::collections::HashSet;

use base64::prelude::*;
use iiifb_domain::Manifest;
use reqwest::header::{AUTHORIZATION, ETAG, IF_MATCH};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ClientError;

const SHOW_EXTRAS_HEADER: &str = "X-IIIF-CS-Show-Extras";

/// ETag-gated read-modify-write upload of manifests to the IIIF cloud
/// service, with explicit re-ingest classification.
pub struct IiifPublisher {
    client: reqwest::Client,
    authorization: String,
}

impl IiifPublisher {
    pub fn new(client: reqwest::Client, basic_credentials: &str) -> Self {
        let encoded = BASE64_STANDARD.encode(basic_credentials.as_bytes());
        Self {
            client,
            authorization: format!("Basic {encoded}"),
        }
    }

    /// GET the current manifest (if any), classify which assets need
    /// re-ingesting, then PUT the new manifest gated on the captured ETag.
    pub async fn publish(
        &self,
        api_manifest_uri: &str,
        manifest: &mut Manifest,
    ) -> Result<(), ClientError> {
        info!(uri = api_manifest_uri, "See if a Manifest already exists");
        let resp = self
            .client
            .get(api_manifest_uri)
            .header(AUTHORIZATION, &self.authorization)
            .header(SHOW_EXTRAS_HEADER, "All")
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("GET {api_manifest_uri}: {e}")))?;

        let mut etag: Option<String> = None;
        match resp.status().as_u16() {
            404 => debug!(uri = api_manifest_uri, "Manifest does not already exist"),
            200 => {
                etag = resp
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                debug!(uri = api_manifest_uri, etag = ?etag, "Manifest already exists");
                let existing: Value = resp.json().await.map_err(|e| {
                    ClientError::Parse(format!("existing manifest {api_manifest_uri}: {e}"))
                })?;
                classify_reingest(&existing, manifest);
            }
            status => {
                return Err(ClientError::Precondition(format!(
                    "Manifest {api_manifest_uri} returned status {status} - cannot process"
                )));
            }
        }

        info!(uri = api_manifest_uri, "Sending PUT");
        let mut request = self
            .client
            .put(api_manifest_uri)
            .header(AUTHORIZATION, &self.authorization)
            .header(SHOW_EXTRAS_HEADER, "All")
            .json(manifest);
        if let Some(etag) = &etag {
            request = request.header(IF_MATCH, etag);
        }
        let put = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("PUT {api_manifest_uri}: {e}")))?;

        match put.status().as_u16() {
            200 | 202 => Ok(()),
            status => Err(ClientError::Precondition(format!(
                "PUT to {api_manifest_uri} returned status {status} - cannot continue"
            ))),
        }
    }
}

/// Flag assets the downstream service must reprocess. The service's own
/// heuristic is conservative and may re-ingest unchanged binaries, so the
/// classification is explicit: new assets and assets whose origin moved get
/// `reingest: true`, everything else is left alone. A repeated asset id is
/// only classified on its first occurrence.
pub fn classify_reingest(existing: &Value, new: &mut Manifest) {
    let existing_resources = existing["paintedResources"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    debug!(
        existing = existing_resources.len(),
        new = new.painted_resources.len(),
        "Checking for assets that have changed"
    );

    let mut seen: HashSet<String> = HashSet::new();
    for resource in new.painted_resources.iter_mut() {
        let asset_id = resource.asset.id.clone();
        if !seen.insert(asset_id.clone()) {
            continue;
        }

        let existing_resource = existing_resources
            .iter()
            .find(|pr| pr["asset"]["id"].as_str() == Some(asset_id.as_str()));

        match existing_resource {
            None => {
                info!(asset = %asset_id, "No existing painted resource, set reingest");
                resource.reingest = Some(true);
            }
            Some(pr) => {
                let existing_origin = pr["asset"]["origin"].as_str().unwrap_or_default();
                if existing_origin != resource.asset.origin {
                    info!(
                        asset = %asset_id,
                        existing_origin,
                        new_origin = %resource.asset.origin,
                        "Origin changed, set reingest"
                    );
                    resource.reingest = Some(true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iiifb_domain::{Asset, CanvasPainting, PaintedResource, language_map};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn painted(asset_id: &str, order: u32, origin: &str) -> PaintedResource {
        PaintedResource {
            canvas_painting: CanvasPainting {
                canvas_id: format!("https://cs.example/2/canvases/{asset_id}"),
                canvas_order: order,
                label: language_map("en", vec![format!("{order}")]),
            },
            asset: Asset {
                id: asset_id.to_string(),
                media_type: "image/jpeg".into(),
                space: 5,
                origin: origin.to_string(),
            },
            reingest: None,
        }
    }

    fn manifest(resources: Vec<PaintedResource>) -> Manifest {
        Manifest {
            kind: "Manifest".into(),
            provider: vec![],
            label: Some(language_map("en", vec!["Title".into()])),
            metadata: vec![],
            rights: None,
            homepage: None,
            public_id: Some("https://cs.example/2/cc/abcd1234".into()),
            painted_resources: resources,
        }
    }

    fn existing_with(resources: Value) -> Value {
        json!({ "type": "Manifest", "paintedResources": resources })
    }

    // ── classify_reingest (pure) ──────────────────────────────────────────────

    #[test]
    fn new_asset_is_flagged() {
        let existing = existing_with(json!([]));
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/01.jpg")]);
        classify_reingest(&existing, &mut new);
        assert_eq!(new.painted_resources[0].reingest, Some(true));
    }

    #[test]
    fn unchanged_origin_is_not_flagged() {
        let existing = existing_with(json!([{
            "asset": { "id": "abcd1234_01.jpg", "origin": "s3://bucket/ag/01.jpg" }
        }]));
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/01.jpg")]);
        classify_reingest(&existing, &mut new);
        assert_eq!(new.painted_resources[0].reingest, None);
    }

    #[test]
    fn changed_origin_is_flagged() {
        let existing = existing_with(json!([{
            "asset": { "id": "abcd1234_01.jpg", "origin": "s3://bucket/ag/v1/01.jpg" }
        }]));
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/v2/01.jpg")]);
        classify_reingest(&existing, &mut new);
        assert_eq!(new.painted_resources[0].reingest, Some(true));
    }

    #[test]
    fn repeated_asset_only_classified_once() {
        let existing = existing_with(json!([]));
        let mut new = manifest(vec![
            painted("abcd1234_01.jpg", 0, "s3://bucket/ag/01.jpg"),
            painted("abcd1234_01.jpg", 1, "s3://bucket/ag/01.jpg"),
        ]);
        classify_reingest(&existing, &mut new);
        assert_eq!(new.painted_resources[0].reingest, Some(true));
        assert_eq!(new.painted_resources[1].reingest, None);
    }

    // ── publish ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_write_has_no_if_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/manifests/abcd1234"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/2/manifests/abcd1234"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .and(header("X-IIIF-CS-Show-Extras", "All"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = IiifPublisher::new(reqwest::Client::new(), "user:pass");
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/01.jpg")]);
        let uri = format!("{}/2/manifests/abcd1234", server.uri());
        publisher.publish(&uri, &mut new).await.unwrap();

        // First write of a new asset gets the reingest flag.
        assert_eq!(new.painted_resources[0].reingest, Some(true));
        let received = server.received_requests().await.unwrap();
        let put = received.iter().find(|r| r.method.as_str() == "PUT").unwrap();
        assert!(put.headers.get("If-Match").is_none());
    }

    #[tokio::test]
    async fn update_carries_etag_and_flags_moved_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/manifests/abcd1234"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("ETag", "\"xyz\"")
                    .set_body_json(existing_with(json!([{
                        "asset": { "id": "abcd1234_01.jpg", "origin": "s3://bucket/ag/v1/01.jpg" }
                    }]))),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/2/manifests/abcd1234"))
            .and(header("If-Match", "\"xyz\""))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = IiifPublisher::new(reqwest::Client::new(), "user:pass");
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/v2/01.jpg")]);
        let uri = format!("{}/2/manifests/abcd1234", server.uri());
        publisher.publish(&uri, &mut new).await.unwrap();
        assert_eq!(new.painted_resources[0].reingest, Some(true));
    }

    #[tokio::test]
    async fn republish_of_identical_manifest_sets_no_flags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/manifests/abcd1234"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("ETag", "\"abc\"")
                    .set_body_json(existing_with(json!([{
                        "asset": { "id": "abcd1234_01.jpg", "origin": "s3://bucket/ag/01.jpg" }
                    }]))),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let publisher = IiifPublisher::new(reqwest::Client::new(), "user:pass");
        let mut new = manifest(vec![painted("abcd1234_01.jpg", 0, "s3://bucket/ag/01.jpg")]);
        let uri = format!("{}/2/manifests/abcd1234", server.uri());
        publisher.publish(&uri, &mut new).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let put = received.iter().find(|r| r.method.as_str() == "PUT").unwrap();
        let body: Value = serde_json::from_slice(&put.body).unwrap();
        for pr in body["paintedResources"].as_array().unwrap() {
            assert!(pr.get("reingest").is_none());
        }
    }

    #[tokio::test]
    async fn unexpected_get_status_fails_publication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let publisher = IiifPublisher::new(reqwest::Client::new(), "user:pass");
        let mut new = manifest(vec![]);
        let uri = format!("{}/2/manifests/abcd1234", server.uri());
        let err = publisher.publish(&uri, &mut new).await.unwrap_err();
        assert!(err.to_string().contains("status 503"), "got: {err}");

        // No PUT after a failed precondition.
        let received = server.received_requests().await.unwrap();
        assert!(received.iter().all(|r| r.method.as_str() != "PUT"));
    }

    #[tokio::test]
    async fn unexpected_put_status_fails_publication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let publisher = IiifPublisher::new(reqwest::Client::new(), "user:pass");
        let mut new = manifest(vec![]);
        let uri = format!("{}/2/manifests/abcd1234", server.uri());
        let err = publisher.publish(&uri, &mut new).await.unwrap_err();
        assert!(err.to_string().contains("returned status 409"), "got: {err}");
    }
}
