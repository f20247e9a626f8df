use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{error, info};

use crate::error::ConfigError;

/// Default watermark floor used when the store is empty and no cutoff is
/// configured.
fn default_watermark_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 8, 0, 0, 0).unwrap()
}

/// The full configuration surface, read from the environment exactly once at
/// startup. Components receive the fields they need; nothing reads the
/// environment after construction.
#[derive(Debug, Clone)]
pub struct Settings {
    // Job store
    pub postgres_connection: String,
    /// Floor for the activity watermark when the store has no rows yet.
    /// Resolved from ACTIVITY_CUTOFF_DATE at startup ("now" resolves to the
    /// startup instant).
    pub watermark_floor: DateTime<Utc>,

    // Stream reader
    pub preservation_activity_stream: String,
    pub read_interval: Duration,

    // Preservation API auth
    pub preservation_client_id: String,
    pub preservation_client_secret: String,
    pub preservation_tenant_id: String,
    pub client_identity_header: String,
    pub iiif_builder_identity: String,

    // Identity service
    pub identity_service_base_url: String,
    pub identity_service_api_header: String,
    pub identity_service_api_key: String,
    pub container_aliases: HashMap<String, String>,
    pub host_aliases: HashMap<String, String>,

    // Coordinator
    pub archival_group_prefixes: Vec<String>,
    pub construct_catalogue_api_uri: bool,

    // IIIF cloud service
    pub rewritten_public_prefix: String,
    pub iiif_cs_presentation_host: String,
    pub iiif_cs_customer_id: u32,
    pub iiif_cs_asset_space_id: u32,
    pub iiif_cs_basic_credentials: String,

    // Catalogue API
    pub catalogue_api_prefix: String,
    pub catalogue_api_key_header: String,
    pub catalogue_api_key_value: String,
}

impl Settings {
    /// OAuth2 scope for the preservation API client-credentials flow.
    pub fn preservation_scope(&self) -> String {
        format!("api://{}/.default", self.preservation_client_id)
    }

    /// Token authority for the preservation API tenant.
    pub fn preservation_authority_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}",
            self.preservation_tenant_id
        )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| std::env::var(name).ok())
    }

    /// Build settings from any string lookup. `from_env` is the production
    /// entry point; tests supply a map.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            get(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let or_default =
            |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let interval_raw = or_default("ACTIVITY_STREAM_READ_INTERVAL", "60");
        let interval_secs: f64 =
            interval_raw
                .parse()
                .map_err(|e: std::num::ParseFloatError| ConfigError::InvalidVar {
                    name: "ACTIVITY_STREAM_READ_INTERVAL",
                    value: interval_raw.clone(),
                    reason: e.to_string(),
                })?;

        let customer_raw = or_default("IIIF_CS_CUSTOMER_ID", "2");
        let customer_id: u32 =
            customer_raw
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidVar {
                    name: "IIIF_CS_CUSTOMER_ID",
                    value: customer_raw.clone(),
                    reason: e.to_string(),
                })?;

        let space_raw = or_default("IIIF_CS_ASSET_SPACE_ID", "5");
        let space_id: u32 =
            space_raw
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidVar {
                    name: "IIIF_CS_ASSET_SPACE_ID",
                    value: space_raw.clone(),
                    reason: e.to_string(),
                })?;

        Ok(Settings {
            postgres_connection: required("POSTGRES_CONNECTION")?,
            watermark_floor: resolve_cutoff(get("ACTIVITY_CUTOFF_DATE").as_deref()),
            preservation_activity_stream: required("PRESERVATION_ACTIVITY_STREAM")?,
            read_interval: Duration::from_secs_f64(interval_secs),
            preservation_client_id: required("PRESERVATION_CLIENT_ID")?,
            preservation_client_secret: required("PRESERVATION_CLIENT_SECRET")?,
            preservation_tenant_id: required("PRESERVATION_TENANT_ID")?,
            client_identity_header: or_default(
                "PRESERVATION_CLIENT_IDENTITY_HEADER",
                "X-Client-Identity",
            ),
            iiif_builder_identity: or_default("IIIF_BUILDER_IDENTITY", "iiif-builder"),
            identity_service_base_url: or_default(
                "IDENTITY_SERVICE_BASE_URL",
                "https://dev-id.library.leeds.ac.uk/api/v1",
            ),
            identity_service_api_header: or_default("IDENTITY_SERVICE_API_HEADER", "X-API-KEY"),
            identity_service_api_key: required("IDENTITY_SERVICE_API_KEY")?,
            container_aliases: parse_aliases(
                get("PRESERVATION_COLLECTIONS_CONTAINER_ALIASES").as_deref(),
            ),
            host_aliases: parse_aliases(get("PRESERVATION_COLLECTIONS_HOST_ALIASES").as_deref()),
            archival_group_prefixes: parse_prefixes(&or_default(
                "ARCHIVAL_GROUP_PREFIXES_TO_PROCESS",
                "cc-test,cc,iiifb/demo/deep",
            )),
            construct_catalogue_api_uri: get("CONSTRUCT_CATALOGUE_API_URI")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            rewritten_public_prefix: or_default(
                "REWRITTEN_PUBLIC_IIIF_PRESENTATION_PREFIX",
                "https://iiif.leeds.ac.uk/presentation/",
            ),
            iiif_cs_presentation_host: or_default(
                "IIIF_CS_PRESENTATION_HOST",
                "https://dev-iiif.leeds.ac.uk/presentation",
            ),
            iiif_cs_customer_id: customer_id,
            iiif_cs_asset_space_id: space_id,
            iiif_cs_basic_credentials: required("IIIF_CS_BASIC_CREDENTIALS")?,
            catalogue_api_prefix: or_default(
                "MVP_CATALOGUE_API_PREFIX",
                "https://explore.library.leeds.ac.uk/imu/utilities/getIIIFData.php?pid=",
            ),
            catalogue_api_key_header: or_default("MVP_CATALOGUE_API_KEY_HEADER", "X-API-KEY"),
            catalogue_api_key_value: required("MVP_CATALOGUE_API_KEY_VALUE")?,
        })
    }
}

/// Resolve ACTIVITY_CUTOFF_DATE into a concrete watermark floor.
///
/// "now" means the startup instant; a parseable RFC 3339 timestamp is used
/// verbatim; unset falls back to the fixed floor. An unparseable value logs
/// and behaves like "now".
fn resolve_cutoff(raw: Option<&str>) -> DateTime<Utc> {
    match raw {
        None => default_watermark_floor(),
        Some(s) if s.eq_ignore_ascii_case("now") => {
            info!("Found 'now' as activity cutoff date");
            Utc::now()
        }
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                error!(
                    cutoff = s,
                    error = %e,
                    "Unable to parse activity cutoff date, using current time instead"
                );
                Utc::now()
            }
        },
    }
}

/// Parse a comma-separated list of `src:dst` pairs. Whitespace-only or
/// missing input means no aliases; malformed pairs are ignored.
pub fn parse_aliases(raw: Option<&str>) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    let Some(raw) = raw else {
        return aliases;
    };
    if raw.trim().is_empty() {
        return aliases;
    }
    for pair in raw.split(',') {
        if let Some((src, dst)) = pair.split_once(':') {
            aliases.insert(src.trim().to_string(), dst.trim().to_string());
        }
    }
    aliases
}

/// Parse the comma-separated archival-group prefix list.
pub fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("POSTGRES_CONNECTION", "postgres://localhost/iiifb"),
            ("PRESERVATION_ACTIVITY_STREAM", "https://pres.example/activity"),
            ("PRESERVATION_CLIENT_ID", "client-id"),
            ("PRESERVATION_CLIENT_SECRET", "client-secret"),
            ("PRESERVATION_TENANT_ID", "tenant-id"),
            ("IDENTITY_SERVICE_API_KEY", "id-key"),
            ("IIIF_CS_BASIC_CREDENTIALS", "user:pass"),
            ("MVP_CATALOGUE_API_KEY_VALUE", "cat-key"),
        ])
    }

    fn settings_from(env: &HashMap<&'static str, &'static str>) -> Settings {
        Settings::from_source(|k| env.get(k).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn defaults_applied() {
        let settings = settings_from(&base_env());
        assert_eq!(settings.read_interval, Duration::from_secs(60));
        assert_eq!(settings.client_identity_header, "X-Client-Identity");
        assert_eq!(settings.iiif_builder_identity, "iiif-builder");
        assert_eq!(settings.iiif_cs_customer_id, 2);
        assert_eq!(settings.iiif_cs_asset_space_id, 5);
        assert_eq!(
            settings.archival_group_prefixes,
            vec!["cc-test", "cc", "iiifb/demo/deep"]
        );
        assert!(!settings.construct_catalogue_api_uri);
        assert!(settings.container_aliases.is_empty());
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let mut env = base_env();
        env.remove("POSTGRES_CONNECTION");
        let err = Settings::from_source(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains("POSTGRES_CONNECTION"));
    }

    #[test]
    fn derived_oauth_values() {
        let settings = settings_from(&base_env());
        assert_eq!(settings.preservation_scope(), "api://client-id/.default");
        assert_eq!(
            settings.preservation_authority_url(),
            "https://login.microsoftonline.com/tenant-id"
        );
    }

    #[test]
    fn cutoff_unset_uses_fixed_floor() {
        let settings = settings_from(&base_env());
        assert_eq!(settings.watermark_floor, default_watermark_floor());
    }

    #[test]
    fn cutoff_timestamp_parsed() {
        let mut env = base_env();
        env.insert("ACTIVITY_CUTOFF_DATE", "2011-11-04T00:05:23Z");
        let settings = settings_from(&env);
        assert_eq!(
            settings.watermark_floor,
            Utc.with_ymd_and_hms(2011, 11, 4, 0, 5, 23).unwrap()
        );
    }

    #[test]
    fn cutoff_now_resolves_to_startup_instant() {
        let mut env = base_env();
        env.insert("ACTIVITY_CUTOFF_DATE", "now");
        let before = Utc::now();
        let settings = settings_from(&env);
        assert!(settings.watermark_floor >= before);
        assert!(settings.watermark_floor <= Utc::now());
    }

    #[test]
    fn cutoff_garbage_falls_back_to_now() {
        let mut env = base_env();
        env.insert("ACTIVITY_CUTOFF_DATE", "not-a-date");
        let before = Utc::now();
        let settings = settings_from(&env);
        assert!(settings.watermark_floor >= before);
    }

    #[test]
    fn aliases_parse_pairs_and_trim() {
        let aliases = parse_aliases(Some("cc-test : cc , olddir:newdir"));
        assert_eq!(aliases.get("cc-test"), Some(&"cc".to_string()));
        assert_eq!(aliases.get("olddir"), Some(&"newdir".to_string()));
    }

    #[test]
    fn aliases_whitespace_only_means_none() {
        assert!(parse_aliases(Some("   ")).is_empty());
        assert!(parse_aliases(None).is_empty());
    }

    #[test]
    fn prefixes_trim_trailing_slash() {
        assert_eq!(parse_prefixes("cc/,iiifb/demo/deep"), vec!["cc", "iiifb/demo/deep"]);
    }

    #[test]
    fn construct_catalogue_flag_truthy_values() {
        for truthy in ["1", "true", "True", "yes"] {
            let mut env = base_env();
            env.insert("CONSTRUCT_CATALOGUE_API_URI", truthy);
            assert!(settings_from(&env).construct_catalogue_api_uri, "{truthy}");
        }
        let mut env = base_env();
        env.insert("CONSTRUCT_CATALOGUE_API_URI", "0");
        assert!(!settings_from(&env).construct_catalogue_api_uri);
    }
}
