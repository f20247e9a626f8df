pub mod manifest;
pub mod types;

pub use manifest::{
    Asset, CanvasPainting, Homepage, LanguageMap, Manifest, MetadataEntry, PaintedResource,
    language_map,
};
pub use types::{Activity, ArchivalGroup, InternalUris, ResolvedIdentity, StorageEntry, StorageMap};
