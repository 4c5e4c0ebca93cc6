use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::power::format_time;

/// EKG recording as two parallel arrays of equal length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EkgTrace {
    /// Voltage in millivolts
    pub voltages_mv: Vec<f64>,

    /// Elapsed time in milliseconds since recording start (non-decreasing)
    pub elapsed_ms: Vec<f64>,
}

impl EkgTrace {
    /// Build a trace from parallel arrays, truncating to the shorter one
    pub fn new(mut voltages_mv: Vec<f64>, mut elapsed_ms: Vec<f64>) -> Self {
        let len = voltages_mv.len().min(elapsed_ms.len());
        voltages_mv.truncate(len);
        elapsed_ms.truncate(len);
        Self {
            voltages_mv,
            elapsed_ms,
        }
    }

    /// Build a trace from `(voltage_mv, elapsed_ms)` samples
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (voltages_mv, elapsed_ms) = samples.into_iter().unzip();
        Self {
            voltages_mv,
            elapsed_ms,
        }
    }

    /// Build a trace with evenly spaced timestamps for a given sample rate
    pub fn with_sample_rate(voltages_mv: Vec<f64>, sample_rate_hz: f64) -> Self {
        let step_ms = 1000.0 / sample_rate_hz;
        let elapsed_ms = (0..voltages_mv.len()).map(|i| i as f64 * step_ms).collect();
        Self {
            voltages_mv,
            elapsed_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.voltages_mv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltages_mv.is_empty()
    }
}

/// One power sample with its absolute wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub timestamp: DateTime<Utc>,

    /// Instantaneous power in watts, `None` when the sensor reported nothing
    pub power: Option<f64>,
}

/// Ordered power stream from one activity file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerTrace {
    pub samples: Vec<PowerSample>,
}

impl PowerTrace {
    pub fn new(samples: Vec<PowerSample>) -> Self {
        Self { samples }
    }

    /// Build a 1 Hz trace starting at `start` from raw watt values
    pub fn from_values(start: DateTime<Utc>, values: &[Option<f64>]) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &power)| PowerSample {
                timestamp: start + chrono::Duration::seconds(i as i64),
                power,
            })
            .collect();
        Self { samples }
    }

    /// Power values in sample order
    pub fn values(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.power).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when at least one sample carries a usable power value
    pub fn has_power(&self) -> bool {
        self.samples
            .iter()
            .any(|s| s.power.map(|p| !p.is_nan()).unwrap_or(false))
    }
}

/// Smoothed heart rate at a point in the recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmPoint {
    /// Seconds since the first sample of the trace
    pub time_seconds: f64,
    pub bpm: f64,
}

/// Best average power sustained over one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerCurvePoint {
    pub window_seconds: u32,
    pub best_average_power_watts: u32,
}

impl PowerCurvePoint {
    /// Short label such as "10s", "5m" or "2h"
    pub fn label(&self) -> String {
        format_time(self.window_seconds)
    }
}

/// Power curve ordered by window duration ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerCurve {
    pub points: Vec<PowerCurvePoint>,
}

impl PowerCurve {
    /// Best effort for a given window, if the curve has it
    pub fn power_at(&self, window_seconds: u32) -> Option<u32> {
        self.points
            .iter()
            .find(|p| p.window_seconds == window_seconds)
            .map(|p| p.best_average_power_watts)
    }

    /// Labels parallel to `points`
    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(PowerCurvePoint::label).collect()
    }

    pub fn windows(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.window_seconds).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Mean and peak power of a trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSummary {
    pub mean_watts: f64,
    pub max_watts: f64,
    /// Number of samples that carried a power value
    pub samples: usize,
}

/// Individual record of an imported activity file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,

    /// Power output in watts
    pub power: Option<f64>,

    /// Heart rate in beats per minute
    pub heart_rate: Option<f64>,
}

/// Activity file reduced to the streams the analyses need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// File the records were read from, if any
    pub source: Option<PathBuf>,
    pub records: Vec<ActivityRecord>,
}

impl Activity {
    pub fn new(source: Option<PathBuf>, records: Vec<ActivityRecord>) -> Self {
        Self { source, records }
    }

    /// Power stream of this activity
    pub fn power_trace(&self) -> PowerTrace {
        PowerTrace::new(
            self.records
                .iter()
                .map(|r| PowerSample {
                    timestamp: r.timestamp,
                    power: r.power,
                })
                .collect(),
        )
    }

    /// Heart-rate stream of this activity
    pub fn heart_rates(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.heart_rate).collect()
    }

    /// Highest heart rate recorded in the file
    pub fn max_heart_rate(&self) -> Option<f64> {
        self.records
            .iter()
            .filter_map(|r| r.heart_rate)
            .filter(|hr| !hr.is_nan())
            .fold(None, |acc: Option<f64>, hr| Some(acc.map_or(hr, |a| a.max(hr))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ekg_trace_construction() {
        let trace = EkgTrace::new(vec![1.0, 2.0, 3.0], vec![0.0, 2.0]);
        assert_eq!(trace.len(), 2);

        let trace = EkgTrace::from_samples(vec![(0.5, 0.0), (0.7, 2.0)]);
        assert_eq!(trace.voltages_mv, vec![0.5, 0.7]);
        assert_eq!(trace.elapsed_ms, vec![0.0, 2.0]);

        let trace = EkgTrace::with_sample_rate(vec![0.0; 4], 500.0);
        assert_eq!(trace.elapsed_ms, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_power_trace_from_values() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let trace = PowerTrace::from_values(start, &[Some(100.0), None, Some(f64::NAN)]);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.samples[1].timestamp, start + chrono::Duration::seconds(1));
        assert!(trace.has_power());

        let empty = PowerTrace::from_values(start, &[None, Some(f64::NAN)]);
        assert!(!empty.has_power());
    }

    #[test]
    fn test_power_curve_lookup_and_labels() {
        let curve = PowerCurve {
            points: vec![
                PowerCurvePoint {
                    window_seconds: 30,
                    best_average_power_watts: 410,
                },
                PowerCurvePoint {
                    window_seconds: 300,
                    best_average_power_watts: 290,
                },
            ],
        };
        assert_eq!(curve.power_at(300), Some(290));
        assert_eq!(curve.power_at(60), None);
        assert_eq!(curve.labels(), vec!["30s".to_string(), "5m".to_string()]);
    }

    #[test]
    fn test_activity_projections() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let activity = Activity::new(
            None,
            vec![
                ActivityRecord {
                    timestamp: start,
                    power: Some(150.0),
                    heart_rate: Some(120.0),
                },
                ActivityRecord {
                    timestamp: start + chrono::Duration::seconds(1),
                    power: None,
                    heart_rate: Some(151.0),
                },
            ],
        );
        assert_eq!(activity.power_trace().values(), vec![Some(150.0), None]);
        assert_eq!(activity.max_heart_rate(), Some(151.0));
    }
}
