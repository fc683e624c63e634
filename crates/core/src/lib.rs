pub mod benchmark;
pub mod memlog;
pub mod runtime;
pub mod vision;

pub use benchmark::{BatchMeasurement, BenchReport, RunStats, render_summary};
pub use runtime::{DeviceKind, Precision};
