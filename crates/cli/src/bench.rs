use std::{path::Path, time::Instant};

use anyhow::{Context, Result, ensure};
use tracing::{info, warn};
use vggt_probe_config::{AppConfig, LocalFileSystem};
use vggt_probe_core::{
    BatchMeasurement, BenchReport, RunStats,
    memlog::{self, tensor_bytes},
    render_summary,
    runtime::{default_dtype_for_device, describe_device, prepare_device_and_dtype, synchronize},
    vision::{list_images, load_and_preprocess_images},
};
use vggt_probe_infer_dinov2::{ModelLoadArgs, load_model};

use crate::resources::{ensure_config_file, prepare_weights_path};

const HEADER_RULE_WIDTH: usize = 50;

pub fn run(fs: &LocalFileSystem, config: &AppConfig, report_path: Option<&Path>) -> Result<()> {
    let settings = &config.benchmark;
    let (device, maybe_dtype) = prepare_device_and_dtype(settings.device, settings.precision)?;
    let dtype = maybe_dtype.unwrap_or_else(|| default_dtype_for_device(&device));
    let device_label = describe_device(&device);

    println!("Device: {device_label}");
    println!("Using dtype: {dtype:?}");
    println!("{}", "-".repeat(HEADER_RULE_WIDTH));

    ensure!(
        settings.image_dir.is_dir(),
        "image directory {} not found",
        settings.image_dir.display()
    );
    let all_images = list_images(&settings.image_dir)?;
    info!(
        "Found {} images in {}",
        all_images.len(),
        settings.image_dir.display()
    );

    let resources = config.active_model_resources()?;
    let config_path = ensure_config_file(fs, &resources)?;
    let weights_path = prepare_weights_path(fs, &resources)?;

    println!("Loading `{}` ({})...", resources.id, resources.repo);
    let load_start = Instant::now();
    let model = load_model(ModelLoadArgs {
        config_path: &config_path,
        weights_path: &weights_path,
        device: device.clone(),
        dtype,
    })
    .with_context(|| format!("failed to load model `{}`", resources.id))?;
    synchronize(&device)?;
    let weights_bytes = memlog::ledger().persistent_bytes();
    info!(
        "Model ready in {:.2?} ({} layers, hidden {}, weights {})",
        load_start.elapsed(),
        model.config().num_hidden_layers,
        model.config().hidden_size,
        weights_path.display()
    );
    println!("Model loaded successfully");

    let mut results = Vec::new();
    for &num_images in &settings.batch_sizes {
        if num_images > all_images.len() {
            warn!(
                "Skipping {num_images} images: only {} available",
                all_images.len()
            );
            continue;
        }
        println!("\nTesting with {num_images} images:");

        let load_start = Instant::now();
        let images = load_and_preprocess_images(&all_images[..num_images], settings.target_size)?
            .to_device(&device)?;
        synchronize(&device)?;
        let load_secs = load_start.elapsed().as_secs_f64();
        println!("  Image loading time: {load_secs:.3}s");
        println!("  Images shape: {:?}", images.dims());

        let _input = memlog::transient(tensor_bytes(&images));
        memlog::reset_peak();
        if !memlog::reset_host_peak_rss() {
            warn!("host peak RSS cannot be reset on this platform");
        }

        for _ in 0..settings.warmup_runs {
            model.forward(&images)?;
        }
        synchronize(&device)?;

        let mut samples = Vec::with_capacity(settings.timed_runs);
        for _ in 0..settings.timed_runs {
            synchronize(&device)?;
            let start = Instant::now();
            let output = model.forward(&images)?;
            synchronize(&device)?;
            samples.push(start.elapsed());
            drop(output);
        }
        let inference =
            RunStats::from_durations(&samples).context("benchmark recorded no timed runs")?;

        let measurement = BatchMeasurement {
            num_images,
            load_secs,
            input_shape: images.dims().to_vec(),
            inference,
            peak_tracked_bytes: memlog::peak_bytes(),
            host_peak_rss: memlog::host_peak_rss(),
        };
        println!(
            "  Pure inference time: {:.3} ± {:.3}s",
            inference.mean_secs, inference.std_secs
        );
        println!("  Memory usage: {:.2} GB", measurement.memory_gb());
        if let Some(rss) = measurement.host_peak_rss {
            println!("  Host peak RSS: {:.2} GB", rss as f64 / 1e9);
        }
        memlog::log_snapshot(&format!("batch {num_images}"));
        results.push(measurement);
    }

    println!();
    print!("{}", render_summary(&results, &device_label));

    if let Some(path) = report_path {
        let report = BenchReport {
            model: resources.repo.clone(),
            device: device_label,
            dtype: format!("{dtype:?}"),
            weights_bytes,
            results,
        };
        report.write(path)?;
        info!("Benchmark report written to {}", path.display());
    }
    Ok(())
}
