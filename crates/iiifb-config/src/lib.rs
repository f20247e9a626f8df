mod settings;
pub mod error;

pub use error::ConfigError;
pub use settings::{Settings, parse_aliases, parse_prefixes};
