use std::{fs, path::Path};

use anyhow::Result;
use vggt_probe_video::{clear_frames, find_recent_upload, list_frames};

const PREFIX: &str = "input_images_";

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")?;
    Ok(())
}

#[test]
fn newest_upload_with_a_video_wins() -> Result<()> {
    let root = tempfile::tempdir()?;
    touch(&root.path().join("input_images_20240101_090000/a/old.mp4"))?;
    touch(&root.path().join("input_images_20240301_120000/nested/GX010042.MP4"))?;
    touch(&root.path().join("input_images_20240301_120000/notes.txt"))?;
    touch(&root.path().join("unrelated/newer.mp4"))?;

    let found = find_recent_upload(root.path(), PREFIX, 3)?;
    assert_eq!(
        found,
        Some(root.path().join("input_images_20240301_120000/nested/GX010042.MP4"))
    );
    Ok(())
}

#[test]
fn upper_case_extension_is_preferred_within_an_upload() -> Result<()> {
    let root = tempfile::tempdir()?;
    touch(&root.path().join("input_images_1/a.mp4"))?;
    touch(&root.path().join("input_images_1/z/B.MP4"))?;

    let found = find_recent_upload(root.path(), PREFIX, 3)?;
    assert_eq!(found, Some(root.path().join("input_images_1/z/B.MP4")));
    Ok(())
}

#[test]
fn only_the_most_recent_uploads_are_searched() -> Result<()> {
    let root = tempfile::tempdir()?;
    touch(&root.path().join("input_images_1/clip.mp4"))?;
    for name in ["input_images_2", "input_images_3", "input_images_4"] {
        fs::create_dir_all(root.path().join(name))?;
    }

    assert_eq!(find_recent_upload(root.path(), PREFIX, 3)?, None);
    assert_eq!(
        find_recent_upload(root.path(), PREFIX, 4)?,
        Some(root.path().join("input_images_1/clip.mp4"))
    );
    Ok(())
}

#[test]
fn frames_are_listed_and_cleared_per_prefix() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for name in ["method1_000002.png", "method1_000001.png", "method2_000001.png", "method1.log"] {
        touch(&dir.path().join(name))?;
    }

    let frames = list_frames(dir.path(), "method1_")?;
    let names: Vec<_> = frames
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
        .collect();
    assert_eq!(names, ["method1_000001.png", "method1_000002.png"]);

    assert_eq!(clear_frames(dir.path(), "method1_")?, 2);
    assert!(list_frames(dir.path(), "method1_")?.is_empty());
    assert_eq!(list_frames(dir.path(), "method2_")?.len(), 1);
    Ok(())
}
