//! EKG peak detection and heart-rate estimation
//!
//! Heartbeats are found as local maxima of a subsampled voltage trace that rise
//! above an adaptive threshold (`mean + k * stdev + offset`). Consecutive peaks
//! form RR intervals, which are converted to beats per minute and optionally
//! smoothed over a window of beats.
//!
//! Every function here is pure: no logging, no I/O, no retained state.

use crate::config::EkgSettings;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{BpmPoint, EkgTrace};
use crate::stats;

/// Seconds per minute, for RR interval to BPM conversion
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Heart-rate estimator parameterized by [`EkgSettings`]
#[derive(Debug, Clone, Default)]
pub struct EkgAnalyzer {
    settings: EkgSettings,
}

impl EkgAnalyzer {
    pub fn new(settings: EkgSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EkgSettings {
        &self.settings
    }

    /// Peak detection threshold for an already subsampled series.
    ///
    /// Non-finite samples are left out of the statistics. Returns `None` when
    /// fewer than two finite samples remain.
    pub fn threshold(&self, subsampled: &[f64]) -> Option<f64> {
        let finite: Vec<f64> = subsampled.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = stats::mean(&finite)?;
        let std_dev = stats::sample_std_dev(&finite)?;
        Some(mean + self.settings.std_multiplier * std_dev + self.settings.threshold_offset_mv)
    }

    /// Find heartbeat peaks in a voltage series.
    ///
    /// The series is subsampled with stride `respacing_factor` (0 is treated
    /// as 1). A subsampled position is a peak when it is greater than or equal
    /// to both neighbours and strictly above the threshold; the first and last
    /// positions are never peaks. Returned indices refer to the original
    /// series and are strictly increasing.
    pub fn find_peaks(&self, voltages_mv: &[f64], respacing_factor: usize) -> Vec<usize> {
        let stride = respacing_factor.max(1);
        let subsampled: Vec<f64> = voltages_mv.iter().step_by(stride).copied().collect();

        if subsampled.len() < 3 {
            return Vec::new();
        }

        let threshold = match self.threshold(&subsampled) {
            Some(t) => t,
            None => return Vec::new(),
        };

        subsampled
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] >= w[0] && w[1] >= w[2] && w[1] > threshold)
            .map(|(i, _)| (i + 1) * stride)
            .collect()
    }

    /// Peaks of a trace using the configured respacing factor
    pub fn find_trace_peaks(&self, trace: &EkgTrace) -> Vec<usize> {
        self.find_peaks(&trace.voltages_mv, self.settings.respacing_factor)
    }

    /// Instantaneous BPM for every RR interval between consecutive peaks
    pub fn instantaneous_bpm(&self, peaks: &[usize]) -> Vec<f64> {
        peaks
            .windows(2)
            .map(|pair| {
                let rr_seconds = (pair[1] - pair[0]) as f64 / self.settings.sample_rate_hz;
                SECONDS_PER_MINUTE / rr_seconds
            })
            .collect()
    }

    /// Mean heart rate over the whole trace.
    ///
    /// Fails with `InsufficientData` below two peaks and with `NoValidData`
    /// when every interval exceeds the plausibility ceiling.
    pub fn estimate_heart_rate_average(&self, trace: &EkgTrace) -> AnalysisResult<f64> {
        let peaks = self.find_trace_peaks(trace);
        if peaks.len() < 2 {
            return Err(AnalysisError::insufficient("average heart rate", 2, peaks.len()));
        }

        let max_bpm = self.settings.max_bpm;
        let bpm_values: Vec<f64> = self
            .instantaneous_bpm(&peaks)
            .into_iter()
            .filter(|&bpm| bpm <= max_bpm)
            .collect();

        stats::mean(&bpm_values).ok_or_else(|| {
            AnalysisError::no_valid(
                "average heart rate",
                format!("all BPM values exceed {}", max_bpm),
            )
        })
    }

    /// Smoothed heart rate series with the configured window and ceiling
    pub fn heart_rate_series(&self, trace: &EkgTrace) -> AnalysisResult<Vec<BpmPoint>> {
        self.estimate_heart_rate_series(trace, self.settings.window_size, self.settings.max_bpm)
    }

    /// Time-resolved heart rate smoothed over `window_size` beats.
    ///
    /// The first `window_size` entries all carry the mean of the first
    /// `window_size` valid BPM values; from then on entry `i` is the mean of
    /// valid values `[i - window_size, i)`, which excludes the current one.
    /// Intervals above `max_bpm_threshold` are dropped together with the peak
    /// that ends them, so entry `i` is timestamped at the peak closing valid
    /// interval `i`.
    pub fn estimate_heart_rate_series(
        &self,
        trace: &EkgTrace,
        window_size: usize,
        max_bpm_threshold: f64,
    ) -> AnalysisResult<Vec<BpmPoint>> {
        const CALCULATION: &str = "heart rate series";

        if trace.elapsed_ms.len() != trace.voltages_mv.len() {
            return Err(AnalysisError::invalid_parameter(
                CALCULATION,
                "elapsed_ms",
                format!(
                    "{} timestamps for {} samples",
                    trace.elapsed_ms.len(),
                    trace.voltages_mv.len()
                ),
            ));
        }

        if window_size == 0 {
            return Err(AnalysisError::insufficient(CALCULATION, 1, 0));
        }

        let peaks = self.find_trace_peaks(trace);
        if peaks.len() < window_size + 1 {
            return Err(AnalysisError::insufficient(
                CALCULATION,
                window_size + 1,
                peaks.len(),
            ));
        }

        // One mask drives both the BPM values and the peaks used for timestamps
        let (bpm_values, valid_peaks): (Vec<f64>, Vec<usize>) = self
            .instantaneous_bpm(&peaks)
            .into_iter()
            .zip(peaks.iter().skip(1).copied())
            .filter(|(bpm, _)| *bpm <= max_bpm_threshold)
            .unzip();

        if bpm_values.len() < window_size {
            return Err(AnalysisError::insufficient(
                CALCULATION,
                window_size,
                bpm_values.len(),
            ));
        }

        let t0 = trace.elapsed_ms[0];
        let plateau = window_mean(&bpm_values[..window_size]);

        let series = bpm_values
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let bpm = if i < window_size {
                    plateau
                } else {
                    window_mean(&bpm_values[i - window_size..i])
                };
                BpmPoint {
                    time_seconds: (trace.elapsed_ms[valid_peaks[i]] - t0) / 1000.0,
                    bpm,
                }
            })
            .collect();

        Ok(series)
    }
}

/// Mean of a non-empty window
fn window_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Find peaks with the default settings
pub fn find_peaks(voltages_mv: &[f64], respacing_factor: usize) -> Vec<usize> {
    EkgAnalyzer::default().find_peaks(voltages_mv, respacing_factor)
}

/// Average heart rate with the default settings
pub fn estimate_heart_rate_average(trace: &EkgTrace) -> AnalysisResult<f64> {
    EkgAnalyzer::default().estimate_heart_rate_average(trace)
}

/// Smoothed heart rate series with the default sample rate and detector
pub fn estimate_heart_rate_series(
    trace: &EkgTrace,
    window_size: usize,
    max_bpm_threshold: f64,
) -> AnalysisResult<Vec<BpmPoint>> {
    EkgAnalyzer::default().estimate_heart_rate_series(trace, window_size, max_bpm_threshold)
}
