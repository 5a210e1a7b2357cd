//! Statistical measurement of the 7-tick contract (§4.9): histogram-based
//! p95, sigma-level, Cpk, DPM, and throughput, each checked against a
//! critical-to-quality (CTQ) threshold.

use crate::telemetry::now_cycles;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// The Chatman constant: the declared upper specification limit, in cycles.
pub const CHATMAN_CONSTANT: f64 = 7.0;

const HISTOGRAM_BUCKETS: usize = 256;
const DEFAULT_SAMPLE_SIZE: usize = 1_000_000;
const SAMPLE_BATCH: usize = 1024;

#[derive(Debug, Error, PartialEq)]
pub enum GatekeeperError {
    #[error("cannot compute statistics over zero samples")]
    EmptySample,
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// 256-bucket histogram over cycle counts in `[0, max_bucket_value]`,
/// used to compute p95 without sorting the whole sample.
struct Histogram {
    buckets: [u64; HISTOGRAM_BUCKETS],
    bucket_width: f64,
    count: u64,
}

impl Histogram {
    fn new(max_value: f64) -> Self {
        let bucket_width = (max_value / HISTOGRAM_BUCKETS as f64).max(f64::EPSILON);
        Self { buckets: [0; HISTOGRAM_BUCKETS], bucket_width, count: 0 }
    }

    fn record(&mut self, value: f64) {
        let idx = ((value / self.bucket_width) as usize).min(HISTOGRAM_BUCKETS - 1);
        self.buckets[idx] += 1;
        self.count += 1;
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let target = (p * self.count as f64).ceil() as u64;
        let mut cumulative = 0u64;
        for (i, &bucket_count) in self.buckets.iter().enumerate() {
            cumulative += bucket_count;
            if cumulative >= target {
                return (i as f64 + 1.0) * self.bucket_width;
            }
        }
        HISTOGRAM_BUCKETS as f64 * self.bucket_width
    }
}

/// Abramowitz-Stegun 7.1.26 approximation of the complementary error
/// function, accurate to ~1.5e-7.
fn erfc(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let erf = 1.0 - poly * (-x * x).exp();
    1.0 - sign * erf
}

/// Process-capability statistics for one batch of cycle samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProcessCapability {
    pub mean: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub sigma_level: f64,
    pub cpk: f64,
    pub dpm: f64,
    pub throughput_mops: f64,
}

impl ProcessCapability {
    fn calculate(samples: &[f64], elapsed: Duration) -> Result<Self, GatekeeperError> {
        if samples.is_empty() {
            return Err(GatekeeperError::EmptySample);
        }

        let mu = mean(samples);
        let sigma = std_dev(samples);

        let max_value = samples.iter().cloned().fold(0.0f64, f64::max).max(CHATMAN_CONSTANT * 2.0);
        let mut histogram = Histogram::new(max_value);
        for &s in samples {
            histogram.record(s);
        }
        let p95 = histogram.percentile(0.95);

        let sigma_level = if sigma > 0.0 {
            (CHATMAN_CONSTANT - mu) / sigma
        } else if mu <= CHATMAN_CONSTANT {
            6.0
        } else {
            0.0
        };
        let cpk = sigma_level / 3.0;
        let dpm = 0.5 * erfc(sigma_level / std::f64::consts::SQRT_2) * 1_000_000.0;

        let throughput_mops = samples.len() as f64 / elapsed.as_secs_f64() / 1_000_000.0;

        Ok(Self { mean: mu, std_dev: sigma, p95, sigma_level, cpk, dpm, throughput_mops })
    }
}

/// Pass/fail per critical-to-quality threshold, plus a composite verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CtqVerdict {
    pub p95_ok: bool,
    pub throughput_ok: bool,
    pub sigma_ok: bool,
    pub passed: bool,
}

impl CtqVerdict {
    fn evaluate(capability: &ProcessCapability) -> Self {
        let p95_ok = capability.p95 <= CHATMAN_CONSTANT;
        let throughput_ok = capability.throughput_mops >= 10.0;
        let sigma_ok = capability.sigma_level >= 4.0;
        Self { p95_ok, throughput_ok, sigma_ok, passed: p95_ok && throughput_ok && sigma_ok }
    }
}

/// Full Gatekeeper report: capability stats, CTQ verdict, and whether the
/// sample loop was cut short by the wall-clock stop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GatekeeperReport {
    pub capability: ProcessCapability,
    pub verdict: CtqVerdict,
    pub samples_taken: usize,
    pub timed_out: bool,
}

/// Runs fixed-size samples of a representative operation and computes the
/// Gatekeeper statistics (§4.9). The sample loop checks a wall-clock stop
/// after every batch of 1024 samples (§5) and returns partial results with
/// `timed_out = true` if it fires.
pub struct Gatekeeper {
    sample_size: usize,
    timeout: Duration,
}

impl Gatekeeper {
    pub fn new(sample_size: usize, timeout: Duration) -> Self {
        Self { sample_size: sample_size.max(1), timeout }
    }

    /// Sample `operation` (measured via `now_cycles`) `sample_size` times.
    pub fn run(&self, mut operation: impl FnMut()) -> Result<GatekeeperReport, GatekeeperError> {
        let start = Instant::now();
        let mut samples = Vec::with_capacity(self.sample_size);
        let mut timed_out = false;

        'outer: while samples.len() < self.sample_size {
            for _ in 0..SAMPLE_BATCH {
                if samples.len() >= self.sample_size {
                    break;
                }
                let before = now_cycles();
                operation();
                let after = now_cycles();
                samples.push(after.saturating_sub(before) as f64);
            }
            if start.elapsed() >= self.timeout {
                timed_out = true;
                break 'outer;
            }
        }

        let capability = ProcessCapability::calculate(&samples, start.elapsed())?;
        let verdict = CtqVerdict::evaluate(&capability);

        if verdict.passed {
            info!(?capability, "gatekeeper CTQs passed");
        } else {
            warn!(?capability, "gatekeeper CTQs failed");
        }

        Ok(GatekeeperReport { capability, verdict, samples_taken: samples.len(), timed_out })
    }

    /// Run with precomputed samples (in cycles) instead of timing a live
    /// closure — used by tests and offline analysis (S6).
    pub fn run_over_samples(samples: &[f64], elapsed: Duration) -> Result<GatekeeperReport, GatekeeperError> {
        let capability = ProcessCapability::calculate(samples, elapsed)?;
        let verdict = CtqVerdict::evaluate(&capability);
        Ok(GatekeeperReport { capability, verdict, samples_taken: samples.len(), timed_out: false })
    }
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_constant_time_loop_passes_all_ctqs() {
        // 1,000,000 samples averaging 3 cycles with sigma = 0.4 (S6).
        let samples: Vec<f64> = (0..1_000_000)
            .map(|i| 3.0 + 0.4 * (if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        let elapsed = Duration::from_millis(50); // well under 10 MOPS requires < 100ms for 1e6 samples
        let report = Gatekeeper::run_over_samples(&samples, elapsed).unwrap();

        assert!(report.capability.p95 <= CHATMAN_CONSTANT);
        assert!(report.verdict.p95_ok);
        assert!(report.verdict.sigma_ok);
        assert!(report.verdict.throughput_ok);
        assert!(report.verdict.passed);
    }

    #[test]
    fn sigma_level_formula_matches_spec_within_tolerance() {
        let samples = vec![3.0; 100];
        // std_dev of a constant vector is 0: sigma_level defined as 6.0 by convention.
        let report = Gatekeeper::run_over_samples(&samples, Duration::from_millis(1)).unwrap();
        assert_eq!(report.capability.sigma_level, 6.0);

        let mut varied = vec![3.0; 50];
        varied.extend(vec![3.8; 50]);
        let report = Gatekeeper::run_over_samples(&varied, Duration::from_millis(1)).unwrap();
        let mu = mean(&varied);
        let sigma = std_dev(&varied);
        let expected = (CHATMAN_CONSTANT - mu) / sigma;
        assert!((report.capability.sigma_level - expected).abs() < 1e-9 * expected.abs().max(1.0));
    }

    #[test]
    fn empty_sample_is_rejected() {
        assert_eq!(
            Gatekeeper::run_over_samples(&[], Duration::from_millis(1)),
            Err(GatekeeperError::EmptySample)
        );
    }

    #[test]
    fn over_budget_mean_fails_sigma_ctq() {
        let samples = vec![20.0; 1000];
        let report = Gatekeeper::run_over_samples(&samples, Duration::from_millis(10)).unwrap();
        assert!(!report.verdict.sigma_ok);
        assert!(!report.verdict.passed);
    }

    #[test]
    fn gatekeeper_run_drives_a_live_closure() {
        let gk = Gatekeeper::new(4096, Duration::from_secs(5));
        let mut counter = 0u64;
        let report = gk.run(|| counter = counter.wrapping_add(1)).unwrap();
        assert_eq!(report.samples_taken, 4096);
        assert!(!report.timed_out);
    }

    #[test]
    fn erfc_matches_known_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!(erfc(10.0) < 1e-10);
    }
}
