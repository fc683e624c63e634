use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::debug;

const VIDEO_PATTERNS: [&str; 2] = ["**/*.MP4", "**/*.mp4"];

/// Most recent uploaded video under `root`.
///
/// Upload directories are entries of `root` whose name starts with `prefix`.
/// Names embed a timestamp, so they are ranked by name, newest first, and only
/// the first `limit` are searched. Within a directory upper-case `.MP4` files
/// win over `.mp4`.
pub fn find_recent_upload(root: &Path, prefix: &str, limit: usize) -> Result<Option<PathBuf>> {
    let mut uploads = Vec::new();
    for entry in fs::read_dir(root)
        .with_context(|| format!("failed to list upload root {}", root.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            uploads.push((name, entry.path()));
        }
    }
    uploads.sort_by(|a, b| b.0.cmp(&a.0));

    for (name, dir) in uploads.into_iter().take(limit) {
        debug!("searching upload {name} for videos");
        if let Some(video) = first_video(&dir)? {
            return Ok(Some(video));
        }
    }
    Ok(None)
}

fn first_video(dir: &Path) -> Result<Option<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    for suffix in VIDEO_PATTERNS {
        let pattern = format!("{base}/{suffix}");
        let found = glob::glob(&pattern)
            .with_context(|| format!("invalid upload pattern {pattern}"))?
            .filter_map(|entry| entry.ok())
            .find(|path| path.is_file());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}
