use std::fmt;

use super::TraceId;

/// Decides, once per trace root, whether the trace is recorded.
pub trait Sampler: Send + Sync + fmt::Debug {
    fn should_sample(&self, trace_id: TraceId) -> bool;
}

/// Record every trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSample;

impl Sampler for AlwaysSample {
    fn should_sample(&self, _trace_id: TraceId) -> bool {
        true
    }
}

/// Record nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSample;

impl Sampler for NeverSample {
    fn should_sample(&self, _trace_id: TraceId) -> bool {
        false
    }
}

/// Probabilistic sampling, deterministic per trace id.
#[derive(Debug, Clone, Copy)]
pub struct RatioSampler {
    ratio: f64,
    threshold: u64,
}

impl RatioSampler {
    /// `ratio` is clamped to `[0, 1]`.
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let threshold = (ratio * u64::MAX as f64) as u64;
        Self { ratio, threshold }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Sampler for RatioSampler {
    fn should_sample(&self, trace_id: TraceId) -> bool {
        if self.ratio >= 1.0 {
            return true;
        }
        if self.ratio <= 0.0 {
            return false;
        }
        trace_id.low_u64() < self.threshold
    }
}
