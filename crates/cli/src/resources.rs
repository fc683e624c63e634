use std::path::{Path, PathBuf};

use anyhow::Result;
use vggt_probe_assets as assets;
use vggt_probe_config::{LocalFileSystem, ModelResources, ResourceLocation, VirtualFileSystem};

/// Downloads `config.json` into its configured location when missing.
pub fn ensure_config_file(fs: &LocalFileSystem, resources: &ModelResources) -> Result<PathBuf> {
    ensure_resource(fs, &resources.config, |path| {
        assets::ensure_model_config(&resources.repo, path)
    })
}

/// A weights path set by the user must exist; the cached default is downloaded.
pub fn prepare_weights_path(fs: &LocalFileSystem, resources: &ModelResources) -> Result<PathBuf> {
    match &resources.weights {
        ResourceLocation::Physical(path) => {
            assets::resolve_weights(Some(path.as_path()), &resources.repo, path)
        }
        location => ensure_resource(fs, location, |path| {
            assets::resolve_weights(None, &resources.repo, path)
        }),
    }
}

fn ensure_resource<F>(
    fs: &LocalFileSystem,
    location: &ResourceLocation,
    ensure_fn: F,
) -> Result<PathBuf>
where
    F: Fn(&Path) -> Result<PathBuf>,
{
    match location {
        ResourceLocation::Physical(path) => ensure_fn(path),
        ResourceLocation::Virtual(vpath) => fs.with_physical_path(vpath, ensure_fn),
    }
}
