pub mod boilerplate;
pub mod decorate;
pub mod error;
pub mod painted;

pub use boilerplate::boilerplate_manifest;
pub use decorate::add_descriptive_metadata;
pub use error::BuildError;
pub use painted::add_painted_resources;
