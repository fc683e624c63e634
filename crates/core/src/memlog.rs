use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use candle_core::Tensor;
use tracing::debug;

/// Byte counters for tensors the model registers while it runs.
///
/// Candle does not expose allocator statistics, so the benchmark tracks what it
/// can see: persistent weights plus transient activations, with a high-water
/// mark that can be reset between measurements.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    persistent: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryLedger {
    pub const fn new() -> Self {
        Self {
            persistent: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn add_persistent(&self, bytes: usize) {
        self.persistent.fetch_add(bytes, Ordering::Relaxed);
        self.bump_peak();
    }

    pub fn persistent_bytes(&self) -> usize {
        self.persistent.load(Ordering::Relaxed)
    }

    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    pub fn current_bytes(&self) -> usize {
        self.persistent_bytes() + self.live_bytes()
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed).max(self.current_bytes())
    }

    /// Drops the high-water mark back to what is currently tracked.
    pub fn reset_peak(&self) {
        self.peak.store(self.current_bytes(), Ordering::Relaxed);
    }

    pub fn transient(&self, bytes: usize) -> Transient<'_> {
        self.live.fetch_add(bytes, Ordering::Relaxed);
        self.bump_peak();
        Transient {
            ledger: self,
            bytes,
        }
    }

    fn bump_peak(&self) {
        self.peak.fetch_max(self.current_bytes(), Ordering::Relaxed);
    }
}

/// Live allocation released from the ledger on drop.
#[must_use = "the allocation is released as soon as the guard is dropped"]
pub struct Transient<'a> {
    ledger: &'a MemoryLedger,
    bytes: usize,
}

impl Drop for Transient<'_> {
    fn drop(&mut self) {
        self.ledger.live.fetch_sub(self.bytes, Ordering::Relaxed);
    }
}

static LEDGER: MemoryLedger = MemoryLedger::new();

pub fn ledger() -> &'static MemoryLedger {
    &LEDGER
}

/// Returns the number of bytes occupied by `tensor`.
pub fn tensor_bytes(tensor: &Tensor) -> usize {
    tensor.elem_count() * tensor.dtype().size_in_bytes()
}

pub fn add_persistent(bytes: usize) {
    LEDGER.add_persistent(bytes);
}

pub fn transient(bytes: usize) -> Transient<'static> {
    LEDGER.transient(bytes)
}

pub fn peak_bytes() -> usize {
    LEDGER.peak_bytes()
}

pub fn reset_peak() {
    LEDGER.reset_peak();
}

/// Peak resident set size of this process in bytes (Linux only).
pub fn host_peak_rss() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_hwm(&status)
}

/// Resets the kernel's peak RSS counter. Returns `false` when unsupported.
pub fn reset_host_peak_rss() -> bool {
    fs::write("/proc/self/clear_refs", b"5").is_ok()
}

/// Extracts `VmHWM` from a `/proc/<pid>/status` dump, in bytes.
pub fn parse_vm_hwm(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmHWM:"))?;
    let mut parts = line["VmHWM:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let scale = match parts.next() {
        Some("kB") | None => 1024,
        Some("mB") | Some("MB") => 1024 * 1024,
        Some(_) => return None,
    };
    Some(value * scale)
}

pub fn log_snapshot(tag: &str) {
    let mb = |bytes: usize| bytes as f64 / (1024.0 * 1024.0);
    debug!(
        "[memlog] {tag}: persistent={:.3} MB live={:.3} MB peak={:.3} MB",
        mb(LEDGER.persistent_bytes()),
        mb(LEDGER.live_bytes()),
        mb(LEDGER.peak_bytes())
    );
}
