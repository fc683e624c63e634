use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// PNG frames in `dir` whose file name starts with `prefix`, sorted by name.
pub fn list_frames(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*.png",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(prefix)
    );
    let mut frames = glob::glob(&pattern)
        .with_context(|| format!("invalid frame pattern {pattern}"))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    frames.sort();
    Ok(frames)
}

pub fn count_frames(dir: &Path, prefix: &str) -> Result<usize> {
    Ok(list_frames(dir, prefix)?.len())
}

/// Removes the frames a previous run left behind; returns how many were deleted.
pub fn clear_frames(dir: &Path, prefix: &str) -> Result<usize> {
    let frames = list_frames(dir, prefix)?;
    for frame in &frames {
        fs::remove_file(frame)
            .with_context(|| format!("failed to remove frame {}", frame.display()))?;
    }
    Ok(frames.len())
}
