//! Compression budget and target-size presets.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encode::OutputKind;
use crate::error::PipelineError;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Custom targets that cannot be parsed fall back to this many kilobytes.
pub const FALLBACK_TARGET_KB: u64 = 500;

/// Smallest accepted quality step; bounds the number of search attempts.
pub const MIN_QUALITY_STEP: f32 = 0.01;

/// Caller-specified output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetSize {
    /// Unbounded: one encode pass at the start quality, no iteration.
    #[default]
    Auto,
    /// Maximum acceptable encoded size in bytes.
    Bytes(u64),
}

impl TargetSize {
    pub fn kilobytes(kb: u64) -> Self {
        TargetSize::Bytes(kb.saturating_mul(KIB))
    }

    pub fn megabytes(mb: u64) -> Self {
        TargetSize::Bytes(mb.saturating_mul(MIB))
    }

    /// Byte limit, or `None` in auto mode.
    pub fn limit(self) -> Option<u64> {
        match self {
            TargetSize::Auto => None,
            TargetSize::Bytes(n) => Some(n),
        }
    }
}

impl FromStr for TargetSize {
    type Err = Infallible;

    /// Parses `auto`, `500kb`, `1mb`, or a custom size in kilobytes
    /// (`"250"`, `"250kb"`, `"1.5mb"`). Unparseable custom sizes fall back
    /// to [`FALLBACK_TARGET_KB`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "auto" {
            return Ok(TargetSize::Auto);
        }

        let (number, unit) = if let Some(n) = s.strip_suffix("mb") {
            (n, MIB)
        } else if let Some(n) = s.strip_suffix("kb") {
            (n, KIB)
        } else {
            (s.as_str(), KIB)
        };

        match number.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => {
                Ok(TargetSize::Bytes((v * unit as f64).round() as u64))
            }
            _ => Ok(TargetSize::kilobytes(FALLBACK_TARGET_KB)),
        }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSize::Auto => f.write_str("auto"),
            TargetSize::Bytes(n) if n % MIB == 0 => write!(f, "{}mb", n / MIB),
            TargetSize::Bytes(n) if n % KIB == 0 => write!(f, "{}kb", n / KIB),
            TargetSize::Bytes(n) => write!(f, "{}b", n),
        }
    }
}

/// Tunables of the size-seeking compressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionBudget {
    pub target: TargetSize,
    /// First quality tried.
    pub start_quality: f32,
    /// Lowest quality the search may reach.
    pub quality_floor: f32,
    /// Amount quality drops per attempt.
    pub quality_step: f32,
    /// Lower bound for each output edge after dimension reduction.
    pub min_dimension: u32,
    /// Multiplier applied to the computed scale factor.
    pub reduction_margin: f64,
    /// Quality of the single dimension-reduction pass.
    pub reduction_quality: f32,
    pub kind: OutputKind,
}

impl Default for CompressionBudget {
    fn default() -> Self {
        Self {
            target: TargetSize::Auto,
            start_quality: 0.80,
            quality_floor: 0.10,
            quality_step: 0.10,
            min_dimension: 400,
            reduction_margin: 0.90,
            reduction_quality: 0.80,
            kind: OutputKind::Photographic,
        }
    }
}

impl CompressionBudget {
    /// Default budget with the given target.
    pub fn new(target: TargetSize) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_start_quality(mut self, quality: f32) -> Self {
        self.start_quality = quality;
        self
    }

    /// Check the budget's invariants.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidBudget(msg));

        if self.target == TargetSize::Bytes(0) {
            return invalid("target must be at least one byte".into());
        }
        if !(self.quality_step >= MIN_QUALITY_STEP && self.quality_step <= 1.0) {
            return invalid(format!(
                "quality step {} outside [{}, 1.0]",
                self.quality_step, MIN_QUALITY_STEP
            ));
        }
        if !(self.quality_floor > 0.0
            && self.quality_floor <= self.start_quality
            && self.start_quality <= 1.0)
        {
            return invalid(format!(
                "expected 0 < floor ({}) <= start quality ({}) <= 1.0",
                self.quality_floor, self.start_quality
            ));
        }
        if self.min_dimension == 0 {
            return invalid("minimum dimension must be positive".into());
        }
        if !(self.reduction_margin > 0.0 && self.reduction_margin.is_finite()) {
            return invalid(format!(
                "reduction margin {} must be positive",
                self.reduction_margin
            ));
        }
        if !(self.reduction_quality > 0.0 && self.reduction_quality <= 1.0) {
            return invalid(format!(
                "reduction quality {} outside (0, 1.0]",
                self.reduction_quality
            ));
        }
        Ok(())
    }

    /// Qualities the search tries, in order: start, start - step, ... while
    /// still at or above the floor.
    pub fn quality_schedule(&self) -> Vec<f32> {
        let start = round_quality(self.start_quality as f64);
        let step = round_quality(self.quality_step as f64);
        let floor = round_quality(self.quality_floor as f64);

        let mut qualities = Vec::new();
        let mut i = 0u32;
        loop {
            let q = round_quality(start - step * i as f64);
            if q < floor - 1e-9 {
                break;
            }
            qualities.push(q as f32);
            i += 1;
        }
        qualities
    }
}

/// Snap to six decimals so repeated subtraction of 0.1 stays on 0.1 marks.
fn round_quality(q: f64) -> f64 {
    (q * 1e6).round() / 1e6
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The schedule starts at the start quality, drops by exactly one
        /// step each attempt, and never goes below the floor.
        #[test]
        fn prop_schedule_monotonic_and_bounded(
            start_tenths in 1u32..=10,
            floor_tenths in 1u32..=10,
        ) {
            prop_assume!(floor_tenths <= start_tenths);
            let mut budget = CompressionBudget::default();
            budget.start_quality = start_tenths as f32 / 10.0;
            budget.quality_floor = floor_tenths as f32 / 10.0;

            let schedule = budget.quality_schedule();
            prop_assert_eq!(schedule.len() as u32, start_tenths - floor_tenths + 1);
            prop_assert!((schedule[0] - budget.start_quality).abs() < 1e-6);
            for pair in schedule.windows(2) {
                prop_assert!(((pair[0] - pair[1]) - 0.1).abs() < 1e-5);
            }
            for q in &schedule {
                prop_assert!(*q >= budget.quality_floor - 1e-6);
            }
        }
    }
}
