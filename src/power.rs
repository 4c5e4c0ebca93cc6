//! Best-effort power curves
//!
//! A power curve records, for each window duration, the highest average power
//! sustained over any contiguous run of that many samples. FIT-derived records
//! arrive at roughly 1 Hz, so a window of `n` samples is treated as `n`
//! seconds.
//!
//! Missing samples are never read as zero: a window that contains one is not
//! a valid window.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::PowerCurveSettings;
use crate::models::{PowerCurve, PowerCurvePoint, PowerSummary, PowerTrace};
use crate::stats;

/// How several power traces are combined into one curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Concatenate every sample into one long series before computing the
    /// curve. Windows may straddle the boundary between two files.
    #[default]
    Concatenate,
    /// Compute one curve per trace and keep the best value per window.
    PerTraceMax,
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "concatenate" | "concat" => Ok(MergeStrategy::Concatenate),
            "per-trace-max" | "max" => Ok(MergeStrategy::PerTraceMax),
            _ => Err(format!("Invalid merge strategy: {}", s)),
        }
    }
}

/// Short label for a window duration.
///
/// Uses integer division, so non-round durations lose precision
/// (`90` becomes `"1m"`).
pub fn format_time(seconds: u32) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}h", seconds / 3600)
    }
}

/// Drop zero windows, sort ascending and deduplicate
pub fn normalize_windows(window_sizes: &[u32]) -> Vec<u32> {
    let mut windows: Vec<u32> = window_sizes.iter().copied().filter(|&w| w > 0).collect();
    windows.sort_unstable();
    windows.dedup();
    windows
}

/// Best average power over `window_size` samples, rounded down to whole watts.
///
/// Returns `None` when the window is zero or longer than the trace, when every
/// value is missing, or when no window is free of missing samples.
pub fn best_effort(values: &[Option<f64>], window_size: usize) -> Option<u32> {
    if window_size == 0 || window_size > values.len() {
        return None;
    }
    if values.iter().all(|v| stats::present(*v).is_none()) {
        return None;
    }

    stats::max_rolling_mean(values, window_size).map(|mean| mean.max(0.0).floor() as u32)
}

/// Power curve of one series over the given windows.
///
/// Windows are normalized first; any window without a result is left out of
/// the curve.
pub fn build_power_curve(values: &[Option<f64>], window_sizes: &[u32]) -> PowerCurve {
    let points = normalize_windows(window_sizes)
        .into_iter()
        .take_while(|&w| w as usize <= values.len())
        .filter_map(|window_seconds| {
            best_effort(values, window_seconds as usize).map(|watts| PowerCurvePoint {
                window_seconds,
                best_average_power_watts: watts,
            })
        })
        .collect();

    PowerCurve { points }
}

/// Merge every sample of several traces into one gap-free series.
///
/// Samples are ordered by timestamp (stable, so ties keep their input order),
/// a sample whose timestamp repeats an earlier one is dropped, and missing
/// values are removed.
pub fn concatenate_traces(traces: &[PowerTrace]) -> Vec<Option<f64>> {
    let mut samples: Vec<_> = traces.iter().flat_map(|t| t.samples.iter()).collect();
    samples.sort_by_key(|s| s.timestamp);
    samples.dedup_by_key(|s| s.timestamp);

    samples
        .into_iter()
        .filter_map(|s| stats::present(s.power))
        .map(Some)
        .collect()
}

/// Curve across several traces using the chosen merge strategy
pub fn accumulate_power_curve_with(
    traces: &[PowerTrace],
    window_sizes: &[u32],
    strategy: MergeStrategy,
) -> PowerCurve {
    match strategy {
        MergeStrategy::Concatenate => {
            let merged = concatenate_traces(traces);
            build_power_curve(&merged, window_sizes)
        }
        MergeStrategy::PerTraceMax => {
            let curves: Vec<PowerCurve> = traces
                .par_iter()
                .map(|trace| build_power_curve(&trace.values(), window_sizes))
                .collect();

            let mut best: BTreeMap<u32, u32> = BTreeMap::new();
            for point in curves.iter().flat_map(|c| c.points.iter()) {
                let entry = best.entry(point.window_seconds).or_insert(0);
                *entry = (*entry).max(point.best_average_power_watts);
            }

            PowerCurve {
                points: best
                    .into_iter()
                    .map(|(window_seconds, best_average_power_watts)| PowerCurvePoint {
                        window_seconds,
                        best_average_power_watts,
                    })
                    .collect(),
            }
        }
    }
}

/// Best effort ever observed across all traces, with the canonical windows
/// and concatenation
pub fn accumulate_power_curve(traces: &[PowerTrace]) -> PowerCurve {
    let settings = PowerCurveSettings::default();
    accumulate_power_curve_with(traces, &settings.windows(false), MergeStrategy::Concatenate)
}

/// Mean and maximum of the present values
pub fn summarize_power(values: &[Option<f64>]) -> Option<PowerSummary> {
    let present: Vec<f64> = values.iter().filter_map(|v| stats::present(*v)).collect();
    let mean_watts = stats::mean(&present)?;
    let max_watts = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(PowerSummary {
        mean_watts,
        max_watts,
        samples: present.len(),
    })
}

/// Power curve builder bound to a set of windows
#[derive(Debug, Clone, Default)]
pub struct PowerCurveBuilder {
    settings: PowerCurveSettings,
    extended: bool,
}

impl PowerCurveBuilder {
    pub fn new(settings: PowerCurveSettings) -> Self {
        Self {
            settings,
            extended: false,
        }
    }

    /// Include the extended long windows
    pub fn extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    /// Windows this builder evaluates
    pub fn windows(&self) -> Vec<u32> {
        self.settings.windows(self.extended)
    }

    /// Curve of a single trace
    pub fn build(&self, trace: &PowerTrace) -> PowerCurve {
        build_power_curve(&trace.values(), &self.windows())
    }

    /// Curve across traces with the configured merge strategy
    pub fn accumulate(&self, traces: &[PowerTrace]) -> PowerCurve {
        accumulate_power_curve_with(traces, &self.windows(), self.settings.merge_strategy)
    }

    /// Curve across traces with an explicit merge strategy
    pub fn accumulate_with(&self, traces: &[PowerTrace], strategy: MergeStrategy) -> PowerCurve {
        accumulate_power_curve_with(traces, &self.windows(), strategy)
    }
}
