//! Cycle-accurate spans for the 7-tick hot path (§4.9).
//!
//! `now_cycles()` hides the platform's counter choice from every caller:
//! RDTSC on x86-64, `CNTVCT_EL0` on aarch64, a monotonic-clock fallback
//! elsewhere. Spans are gated by a process-wide enable flag; when disabled
//! the begin/end calls compile down to a flag check and nothing else.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static TELEMETRY_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn set_telemetry_enabled(enabled: bool) {
    TELEMETRY_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn telemetry_enabled() -> bool {
    TELEMETRY_ENABLED.load(Ordering::Relaxed)
}

/// Read the platform cycle counter.
#[inline(always)]
pub fn now_cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        unsafe { core::arch::x86_64::_rdtsc() }
    }
    #[cfg(target_arch = "aarch64")]
    {
        let val: u64;
        unsafe {
            core::arch::asm!("mrs {}, cntvct_el0", out(reg) val);
        }
        val
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        // Monotonic-clock fallback: nanoseconds stand in for cycles on
        // platforms without a cheap hardware counter.
        std::time::Instant::now().elapsed().as_nanos() as u64
    }
}

/// One operation's `(start_cycle, end_cycle, operation tag)` (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct Span {
    operation: &'static str,
    start_cycles: u64,
    enabled: bool,
}

impl Span {
    /// Begin a span for `operation`. If telemetry is disabled this is just
    /// a flag check — no cycle read, no allocation.
    #[inline(always)]
    pub fn begin(operation: &'static str) -> Self {
        let enabled = telemetry_enabled();
        Self {
            operation,
            start_cycles: if enabled { now_cycles() } else { 0 },
            enabled,
        }
    }

    /// End the span, returning elapsed cycles (0 if telemetry was disabled)
    /// and emitting a `tracing` debug event carrying the same data.
    #[inline(always)]
    pub fn end(self) -> u64 {
        if !self.enabled {
            return 0;
        }
        let elapsed = now_cycles().saturating_sub(self.start_cycles);
        debug!(operation = self.operation, cycles = elapsed, "span");
        elapsed
    }
}

/// Time `f` and return `(result, elapsed_cycles)`.
#[inline(always)]
pub fn measure<T>(operation: &'static str, f: impl FnOnce() -> T) -> (T, u64) {
    let span = Span::begin(operation);
    let result = f();
    let cycles = span.end();
    (result, cycles)
}
