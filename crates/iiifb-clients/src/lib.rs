pub mod auth;
pub mod catalogue;
pub mod error;
pub mod identity;
pub mod iiif_cs;
pub mod preservation;

pub use auth::{CachedTokenProvider, ClientCredentials, StaticToken, TokenProvider};
pub use catalogue::CatalogueClient;
pub use error::ClientError;
pub use identity::{IdentityConfig, IdentityResolver};
pub use iiif_cs::IiifPublisher;
pub use preservation::{PreservationClient, insecure_localhost};

/// Build the single HTTP client shared by every backend. TLS verification is
/// relaxed only for `https://localhost:` endpoints (local testing).
pub fn build_http_client(allow_insecure_localhost: bool) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(allow_insecure_localhost)
        .build()
}
