use std::sync::Arc;

use anyhow::{Context, Result};
use iiifb_clients::{
    CachedTokenProvider, CatalogueClient, ClientCredentials, IdentityConfig, IdentityResolver,
    IiifPublisher, PreservationClient, build_http_client, insecure_localhost,
};
use iiifb_config::Settings;
use iiifb_store::PostgresStore;
use iiifb_worker::{CoordinatorConfig, JobCoordinator, StreamReader, shutdown};
use tracing::info;

/// Wire every component onto the one shared HTTP client and run the polling
/// loop until a shutdown signal arrives.
pub async fn run(settings: Settings) -> Result<()> {
    let store = Arc::new(
        PostgresStore::connect(&settings.postgres_connection, settings.watermark_floor)
            .await
            .context("connecting job store")?,
    );

    let http = build_http_client(insecure_localhost(&settings.preservation_activity_stream))
        .context("building HTTP client")?;

    let token = Arc::new(CachedTokenProvider::new(
        ClientCredentials {
            authority: settings.preservation_authority_url(),
            client_id: settings.preservation_client_id.clone(),
            client_secret: settings.preservation_client_secret.clone(),
            scope: settings.preservation_scope(),
        },
        http.clone(),
    ));
    let preservation = Arc::new(PreservationClient::new(
        http.clone(),
        token,
        settings.client_identity_header.clone(),
        settings.iiif_builder_identity.clone(),
    ));
    let identity = IdentityResolver::new(
        http.clone(),
        IdentityConfig {
            base_url: settings.identity_service_base_url.clone(),
            api_header: settings.identity_service_api_header.clone(),
            api_key: settings.identity_service_api_key.clone(),
            container_aliases: settings.container_aliases.clone(),
            host_aliases: settings.host_aliases.clone(),
            rewritten_public_prefix: settings.rewritten_public_prefix.clone(),
            presentation_host: settings.iiif_cs_presentation_host.clone(),
            customer_id: settings.iiif_cs_customer_id,
        },
    );
    let catalogue = CatalogueClient::new(
        http.clone(),
        settings.catalogue_api_key_header.clone(),
        settings.catalogue_api_key_value.clone(),
    );
    let publisher = IiifPublisher::new(http, &settings.iiif_cs_basic_credentials);

    let coordinator = JobCoordinator::new(
        store.clone(),
        preservation.clone(),
        identity,
        catalogue,
        publisher,
        CoordinatorConfig {
            archival_group_prefixes: settings.archival_group_prefixes.clone(),
            construct_catalogue_api_uri: settings.construct_catalogue_api_uri,
            catalogue_api_prefix: settings.catalogue_api_prefix.clone(),
            asset_space: settings.iiif_cs_asset_space_id,
        },
    );

    let reader = StreamReader::new(
        store,
        preservation,
        coordinator,
        settings.preservation_activity_stream.clone(),
        settings.read_interval,
    );

    let shutdown = shutdown::from_signals().context("installing signal handlers")?;
    reader.run(shutdown).await?;
    Ok(())
}

/// Apply the job-store DDL and exit. Connecting already migrates; this
/// exists so an empty database can be prepared ahead of the first run.
pub async fn migrate(settings: Settings) -> Result<()> {
    let store = PostgresStore::connect(&settings.postgres_connection, settings.watermark_floor)
        .await
        .context("connecting job store")?;
    store.migrate().await.context("applying migrations")?;
    info!("job store schema is up to date");
    Ok(())
}
