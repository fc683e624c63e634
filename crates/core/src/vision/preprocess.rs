use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use candle_core::{Device, Tensor};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, imageops::FilterType};

/// Spatial granularity of the ViT patch embedding.
pub const PATCH_SIZE: u32 = 14;
/// Default resized width, 37 patches across.
pub const DEFAULT_TARGET_SIZE: u32 = 518;

const PAD_VALUE: u8 = 255;

/// Lists regular files under `dir` in lexical order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads `paths` into a `[N, 3, H, W]` f32 tensor on the CPU with values in `[0, 1]`.
///
/// Every image is resized to `target_size` wide with its height snapped to the
/// patch grid, center-cropped to `target_size` tall when larger, and padded
/// with white to the largest shape in the batch.
pub fn load_and_preprocess_images(paths: &[PathBuf], target_size: u32) -> Result<Tensor> {
    ensure!(!paths.is_empty(), "at least one image is required");
    ensure!(
        target_size >= PATCH_SIZE && target_size % PATCH_SIZE == 0,
        "target size {target_size} must be a positive multiple of {PATCH_SIZE}"
    );

    let images = paths
        .iter()
        .map(|path| {
            let image = image::open(path)
                .with_context(|| format!("failed to open image at {}", path.display()))?;
            Ok(preprocess_image(&image, target_size))
        })
        .collect::<Result<Vec<_>>>()?;

    let max_width = images.iter().map(RgbImage::width).max().unwrap_or(target_size);
    let max_height = images.iter().map(RgbImage::height).max().unwrap_or(target_size);

    let plane = (max_width * max_height) as usize;
    let mut data = Vec::with_capacity(images.len() * 3 * plane);
    for image in &images {
        let padded = pad_to(image, max_width, max_height);
        push_chw(&padded, &mut data);
    }

    let tensor = Tensor::from_vec(
        data,
        (images.len(), 3, max_height as usize, max_width as usize),
        &Device::Cpu,
    )?;
    Ok(tensor)
}

pub fn preprocess_image(image: &DynamicImage, target_size: u32) -> RgbImage {
    let rgb = flatten_alpha(image);
    let (width, height) = rgb.dimensions();
    let scaled = f64::from(height) * (f64::from(target_size) / f64::from(width.max(1)));
    let snapped = (scaled / f64::from(PATCH_SIZE)).round_ties_even() as u32 * PATCH_SIZE;
    let new_height = snapped.max(PATCH_SIZE);

    let resized = image::imageops::resize(&rgb, target_size, new_height, FilterType::CatmullRom);
    if new_height > target_size {
        let top = (new_height - target_size) / 2;
        image::imageops::crop_imm(&resized, 0, top, target_size, target_size).to_image()
    } else {
        resized
    }
}

fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let (width, height) = image.dimensions();
    let rgba = image.to_rgba8();
    RgbImage::from_fn(width, height, |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let alpha = f32::from(px[3]) / 255.0;
        let blend = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(px[0]), blend(px[1]), blend(px[2])])
    })
}

fn pad_to(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([PAD_VALUE; 3]));
    let left = (width - image.width()) / 2;
    let top = (height - image.height()) / 2;
    image::imageops::replace(&mut canvas, image, i64::from(left), i64::from(top));
    canvas
}

fn push_chw(image: &RgbImage, out: &mut Vec<f32>) {
    for channel in 0..3 {
        out.extend(image.pixels().map(|px| f32::from(px.0[channel]) / 255.0));
    }
}
