use std::time::Duration;

use vggt_probe_core::benchmark::{
    BatchMeasurement, RunStats, default_batch_sizes, reference_memory_gb, reference_time,
    render_summary,
};

fn measurement(num_images: usize, mean_secs: f64, peak_bytes: usize) -> BatchMeasurement {
    BatchMeasurement {
        num_images,
        load_secs: 0.1,
        input_shape: vec![num_images, 3, 294, 518],
        inference: RunStats {
            runs: 3,
            mean_secs,
            std_secs: 0.0,
        },
        peak_tracked_bytes: peak_bytes,
        host_peak_rss: None,
    }
}

#[test]
fn run_stats_use_population_deviation() {
    let samples = [
        Duration::from_millis(100),
        Duration::from_millis(200),
        Duration::from_millis(300),
    ];
    let stats = RunStats::from_durations(&samples).expect("non-empty samples");
    assert_eq!(stats.runs, 3);
    assert!((stats.mean_secs - 0.2).abs() < 1e-9);
    // sqrt(((0.1)^2 + 0 + (0.1)^2) / 3)
    assert!((stats.std_secs - 0.081_649_658).abs() < 1e-6);
}

#[test]
fn run_stats_reject_empty_input() {
    assert!(RunStats::from_durations(&[]).is_none());
}

#[test]
fn reference_lookup_is_exact() {
    assert_eq!(default_batch_sizes(), vec![1, 2, 4, 8, 10, 20, 50]);
    assert_eq!(reference_time(8), Some(0.11));
    assert_eq!(reference_memory_gb(50), Some(11.41));
    assert_eq!(reference_time(3), None);
    assert_eq!(reference_time(100), None);
}

#[test]
fn slowdown_compares_against_reference() {
    let slow = measurement(10, 0.28, 0);
    let ratio = slow.slowdown().expect("10 images has a reference");
    assert!((ratio - 2.0).abs() < 1e-9);
    assert!(measurement(3, 1.0, 0).slowdown().is_none());
}

#[test]
fn summary_lists_paper_and_measured_rows() {
    let results = vec![
        measurement(1, 0.08, 2_500_000_000),
        measurement(2, 0.02, 3_000_000_000),
        measurement(3, 0.5, 0),
    ];
    let summary = render_summary(&results, "CUDA:0");

    assert!(summary.contains("BENCHMARK RESULTS SUMMARY"));
    assert!(summary.contains("Paper benchmarks (H100 GPU):"));
    assert!(summary.contains("Our results (CUDA:0):"));
    assert!(summary.contains("Input Frames |    1|    2|    3|"));
    assert!(summary.contains("Time (s)     | 0.08| 0.02| 0.50|"));
    assert!(summary.contains("Memory (GB)  | 2.50| 3.00| 0.00|"));
    assert!(summary.contains("  1 images: 2.0x slower than H100"));
    assert!(summary.contains("  2 images: 2.5x faster than H100"));
    assert!(!summary.contains("  3 images:"));
}
