use std::sync::Arc;

use chrono::Utc;
use iiifb_clients::{CatalogueClient, IdentityResolver, IiifPublisher, PreservationClient};
use iiifb_domain::Activity;
use iiifb_manifest::{add_descriptive_metadata, add_painted_resources, boilerplate_manifest};
use iiifb_store::{ActivityStore, Job};
use tracing::{debug, error, info};
use url::Url;

use crate::error::WorkerError;

/// Skip reason persisted for activities outside the configured prefixes.
/// Recorded as an error message but not a system fault.
pub const SKIP_MESSAGE: &str = "Skipping because AG URI doesn't match configured prefix(es)";

/// Outcome of the fallible external stages: Ok means the manifest was
/// published, Err carries the message persisted on the job row.
type StageOutcome = Result<(), String>;

/// Static coordinator settings, injected at startup.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Paths beneath `/repository/` this deployment is responsible for.
    pub archival_group_prefixes: Vec<String>,
    /// Construct the catalogue URI from the pid instead of trusting the
    /// identity service's value.
    pub construct_catalogue_api_uri: bool,
    pub catalogue_api_prefix: String,
    pub asset_space: u32,
}

/// Drives one activity through the fixed pipeline, persisting progress and
/// the terminal outcome. Stages run strictly in sequence; the first failure
/// short-circuits and is recorded, never retried.
pub struct JobCoordinator {
    store: Arc<dyn ActivityStore>,
    preservation: Arc<PreservationClient>,
    identity: IdentityResolver,
    catalogue: CatalogueClient,
    publisher: IiifPublisher,
    config: CoordinatorConfig,
}

impl JobCoordinator {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        preservation: Arc<PreservationClient>,
        identity: IdentityResolver,
        catalogue: CatalogueClient,
        publisher: IiifPublisher,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            preservation,
            identity,
            catalogue,
            publisher,
            config,
        }
    }

    /// One activity, one row. Store failures are fatal; everything else ends
    /// up in the row's terminal fields.
    pub async fn process_activity(&self, activity: &Activity) -> Result<(), WorkerError> {
        let mut job = self
            .store
            .new_activity(
                activity.end_time,
                &activity.archival_group_uri,
                &activity.activity_type,
            )
            .await?;

        if !self.should_process(&job.archival_group_uri) {
            // Not really an error, but recorded in the same field.
            error!(uri = %job.archival_group_uri, "{SKIP_MESSAGE}");
            job.error_message = Some(SKIP_MESSAGE.to_string());
            job.finished = Some(Utc::now());
            self.store.save(&job).await?;
            return Ok(());
        }

        match self.run_stages(&mut job).await? {
            Ok(()) => {
                job.finished = Some(Utc::now());
                self.store.save(&job).await?;
            }
            Err(message) => {
                job.error_message = Some(message);
                self.store.save(&job).await?;
            }
        }
        Ok(())
    }

    /// The configured prefixes are matched against the archival-group path
    /// beneath `/repository/`.
    fn should_process(&self, archival_group_uri: &str) -> bool {
        let path = Url::parse(archival_group_uri)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix("repository/").unwrap_or(path);
        self.config
            .archival_group_prefixes
            .iter()
            .any(|prefix| path.starts_with(&format!("{prefix}/")))
    }

    async fn run_stages(&self, job: &mut Job) -> Result<StageOutcome, WorkerError> {
        debug!(uri = %job.archival_group_uri, "Loading archival group");
        let archival_group = match self.preservation.archival_group(&job.archival_group_uri).await
        {
            Ok(ag) => ag,
            Err(e) => {
                error!(error = %e, "Failed to load archival group");
                return Ok(Err(e.to_string()));
            }
        };

        debug!(uri = %job.archival_group_uri, "Loading METS");
        let mets = match self.preservation.mets(&job.archival_group_uri).await {
            Ok(mets) => mets,
            Err(e) => {
                error!(error = %e, "Failed to load METS for archival group");
                return Ok(Err(e.to_string()));
            }
        };

        debug!(uri = %job.archival_group_uri, "Calling identity service");
        let identity = match self.identity.resolve(&job.archival_group_uri).await {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, "Failed to get identities for archival group");
                return Ok(Err(e.to_string()));
            }
        };

        job.id_service_pid = Some(identity.pid.clone());
        job.catalogue_api_uri = if self.config.construct_catalogue_api_uri {
            Some(format!("{}{}", self.config.catalogue_api_prefix, identity.pid))
        } else {
            identity.catalogue_api_uri.clone()
        };
        job.public_manifest_uri = Some(identity.manifest_uri.clone());

        let uris = self.identity.internal_uris(&identity.pid, &identity.manifest_uri);
        job.internal_public_manifest_uri = Some(uris.public_manifest_uri.clone());
        job.internal_api_manifest_uri = Some(uris.api_manifest_uri.clone());
        self.store.save(job).await?;

        let Some(catalogue_api_uri) = job.catalogue_api_uri.clone() else {
            error!(pid = %identity.pid, "No catalogue API URI available");
            return Ok(Err("No catalogue API URI available".to_string()));
        };

        debug!(uri = %catalogue_api_uri, "Getting descriptive metadata from catalogue API");
        let descriptive_metadata = match self.catalogue.read(&catalogue_api_uri).await {
            Ok(metadata) => metadata,
            Err(e) => {
                error!(error = %e, "Failed to load descriptive metadata from catalogue API");
                return Ok(Err(e.to_string()));
            }
        };

        let mut manifest = boilerplate_manifest();
        manifest.public_id = Some(uris.public_manifest_uri.clone());
        if let Err(e) = add_descriptive_metadata(&mut manifest, &descriptive_metadata) {
            error!(error = %e, "Failed to parse descriptive metadata from catalogue API");
            return Ok(Err(e.to_string()));
        }

        debug!(uri = %uris.public_manifest_uri, "Adding painted resources to manifest");
        if let Err(e) = add_painted_resources(
            &mut manifest,
            &archival_group,
            &mets,
            &uris.canvas_id_prefix,
            &uris.asset_prefix,
            self.config.asset_space,
        ) {
            error!(error = %e, "Failed to add painted resources to manifest");
            return Ok(Err(e.to_string()));
        }
        info!(
            count = manifest.painted_resources.len(),
            uri = %uris.public_manifest_uri,
            "Added painted resources to manifest"
        );

        debug!(uri = %uris.api_manifest_uri, "Saving manifest to IIIF cloud service");
        if let Err(e) = self.publisher.publish(&uris.api_manifest_uri, &mut manifest).await {
            error!(error = %e, "Failed to PUT manifest to IIIF cloud service");
            return Ok(Err(e.to_string()));
        }

        Ok(Ok(()))
    }
}
