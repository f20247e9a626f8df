use iiifb_domain::{
    Asset, CanvasPainting, Manifest, PaintedResource, ArchivalGroup, language_map,
};
use iiifb_mets::{MetsWrapper, WorkingDirectory};
use tracing::debug;

use crate::error::BuildError;

/// Phase B of manifest assembly: walk the METS physical tree depth-first,
/// files before sub-directories, and append one painted resource per image
/// file. The canvas index counts emitted files only, 0-based across the
/// whole traversal. Replaces whatever painted resources the manifest held.
pub fn add_painted_resources(
    manifest: &mut Manifest,
    archival_group: &ArchivalGroup,
    mets: &MetsWrapper,
    canvas_id_prefix: &str,
    asset_prefix: &str,
    asset_space: u32,
) -> Result<(), BuildError> {
    let mut resources = Vec::new();
    walk(
        &mets.physical_structure,
        archival_group,
        canvas_id_prefix,
        asset_prefix,
        asset_space,
        &mut resources,
    )?;
    debug!(count = resources.len(), "Built painted resources from METS tree");
    manifest.painted_resources = resources;
    Ok(())
}

fn walk(
    dir: &WorkingDirectory,
    archival_group: &ArchivalGroup,
    canvas_id_prefix: &str,
    asset_prefix: &str,
    asset_space: u32,
    out: &mut Vec<PaintedResource>,
) -> Result<(), BuildError> {
    for file in &dir.files {
        if !file.content_type.starts_with("image") {
            continue;
        }

        let entry = archival_group
            .storage_map
            .files
            .get(&file.local_path)
            .ok_or_else(|| BuildError::MissingStorageEntry(file.local_path.clone()))?;
        let flattened = file.local_path.replace('/', "_");
        let origin = format!(
            "{}/{}",
            archival_group.origin.trim_end_matches('/'),
            entry.full_path.trim_start_matches('/')
        );

        out.push(PaintedResource {
            canvas_painting: CanvasPainting {
                canvas_id: format!("{canvas_id_prefix}{flattened}"),
                canvas_order: out.len() as u32,
                label: language_map("en", vec![file.name.clone()]),
            },
            asset: Asset {
                id: format!("{asset_prefix}{flattened}"),
                media_type: file.content_type.clone(),
                space: asset_space,
                origin,
            },
            reingest: None,
        });
    }

    for sub in &dir.directories {
        walk(sub, archival_group, canvas_id_prefix, asset_prefix, asset_space, out)?;
    }

    Ok(())
}
