use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use vggt_probe_core::vision::{list_images, load_and_preprocess_images, preprocess_image};

fn write_rgb(dir: &Path, name: &str, width: u32, height: u32) -> Result<PathBuf> {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([10, 20, 30])).save(&path)?;
    Ok(path)
}

#[test]
fn width_is_fixed_and_height_snaps_to_patch_grid() {
    let landscape = DynamicImage::ImageRgb8(RgbImage::new(1920, 1080));
    let out = preprocess_image(&landscape, 518);
    // 1080 * 518 / 1920 = 291.4 -> 21 patches -> 294
    assert_eq!(out.dimensions(), (518, 294));
}

#[test]
fn tall_images_are_center_cropped() {
    let portrait = DynamicImage::ImageRgb8(RgbImage::new(600, 1200));
    let out = preprocess_image(&portrait, 518);
    assert_eq!(out.dimensions(), (518, 518));
}

#[test]
fn alpha_is_composited_onto_white() {
    let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(28, 28, Rgba([0, 0, 0, 0])));
    let out = preprocess_image(&clear, 28);
    assert_eq!(out.get_pixel(5, 5).0, [255, 255, 255]);
}

#[test]
fn mixed_shapes_are_padded_to_the_largest() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let wide = write_rgb(dir.path(), "a.png", 56, 28)?;
    let square = write_rgb(dir.path(), "b.png", 28, 28)?;

    let batch = load_and_preprocess_images(&[wide, square], 28)?;
    assert_eq!(batch.dims(), &[2, 3, 28, 28]);

    let wide_only = load_and_preprocess_images(&[write_rgb(dir.path(), "c.png", 56, 28)?], 28)?;
    assert_eq!(wide_only.dims(), &[1, 3, 14, 28]);

    let values: Vec<f32> = batch.flatten_all()?.to_vec1()?;
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    // Top row of the padded wide image is white.
    assert_eq!(values[0], 1.0);
    Ok(())
}

#[test]
fn listing_is_sorted_and_skips_directories() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_rgb(dir.path(), "002.png", 14, 14)?;
    write_rgb(dir.path(), "001.png", 14, 14)?;
    std::fs::create_dir(dir.path().join("nested"))?;

    let listed = list_images(dir.path())?;
    let names: Vec<_> = listed
        .iter()
        .filter_map(|p| p.file_name()?.to_str())
        .collect();
    assert_eq!(names, vec!["001.png", "002.png"]);
    Ok(())
}

#[test]
fn empty_input_and_misaligned_size_are_rejected() {
    assert!(load_and_preprocess_images(&[], 518).is_err());
    assert!(load_and_preprocess_images(&[PathBuf::from("x.png")], 500).is_err());
}
