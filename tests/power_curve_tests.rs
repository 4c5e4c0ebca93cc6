//! Power curve behaviour over realistic trace lengths

use chrono::{Duration, TimeZone, Utc};
use effortrs::config::PowerCurveSettings;
use effortrs::models::PowerTrace;
use effortrs::power::{self, MergeStrategy, PowerCurveBuilder};
use effortrs::stats;

fn constant(watts: f64, len: usize) -> Vec<Option<f64>> {
    vec![Some(watts); len]
}

/// All zeros except a 200 W block of `spike_len` samples at `spike_start`
fn spiked_trace(start_hour: u32, len: usize, spike_start: usize, spike_len: usize) -> PowerTrace {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, start_hour, 0, 0).unwrap();
    let values: Vec<Option<f64>> = (0..len)
        .map(|i| {
            if (spike_start..spike_start + spike_len).contains(&i) {
                Some(200.0)
            } else {
                Some(0.0)
            }
        })
        .collect();
    PowerTrace::from_values(start, &values)
}

#[test]
fn test_constant_trace_covers_every_canonical_window() {
    let settings = PowerCurveSettings::default();
    let curve = power::build_power_curve(&constant(200.0, 3700), &settings.windows(false));

    assert_eq!(curve.windows(), settings.windows(false));
    assert_eq!(curve.power_at(3600), Some(200));
    assert!(curve.points.iter().all(|p| p.best_average_power_watts == 200));
}

#[test]
fn test_short_trace_omits_long_windows() {
    let settings = PowerCurveSettings::default();
    let curve = power::build_power_curve(&constant(180.0, 50), &settings.windows(false));

    assert_eq!(curve.windows(), vec![1, 5, 10, 30]);
    assert_eq!(curve.power_at(60), None);
    assert_eq!(curve.labels(), vec!["1s", "5s", "10s", "30s"]);
}

#[test]
fn test_accumulation_dilutes_long_windows() {
    let traces = vec![spiked_trace(7, 2000, 600, 30), spiked_trace(12, 2000, 1500, 30)];
    let curve = power::accumulate_power_curve(&traces);

    assert_eq!(curve.power_at(1), Some(200));
    assert_eq!(curve.power_at(30), Some(200));
    let hour = curve.power_at(3600).unwrap();
    assert!(hour < 200);
    // Both spikes fit in one hour window: 60 x 200 W / 3600
    assert_eq!(hour, 3);
}

#[test]
fn test_accumulation_orders_by_timestamp() {
    // Listed out of order; the merged series follows wall-clock time
    let late = spiked_trace(12, 40, 0, 20);
    let early = spiked_trace(7, 40, 20, 20);
    let curve = power::accumulate_power_curve(&[late, early]);

    // Early spike ends the morning trace, late spike opens the noon trace
    assert_eq!(curve.power_at(30), Some(200));
}

#[test]
fn test_extended_windows() {
    let builder = PowerCurveBuilder::default().extended(true);
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
    let trace = PowerTrace::from_values(start, &constant(150.0, 7300));

    let curve = builder.build(&trace);
    assert_eq!(curve.power_at(7200), Some(150));
    assert_eq!(curve.power_at(6000), Some(150));
    assert_eq!(curve.power_at(9000), None);
    assert_eq!(curve.points.last().map(|p| p.label()), Some("2h".to_string()));
}

#[test]
fn test_gaps_invalidate_windows_until_filled() {
    let mut values = constant(250.0, 120);
    values[30] = None;
    values[90] = None;

    // No 60 sample run is gap-free
    assert_eq!(power::best_effort(&values, 60), None);
    assert_eq!(power::best_effort(&values, 59), Some(250));

    let filled = stats::fill_gaps(&values);
    assert_eq!(power::best_effort(&filled, 60), Some(250));
    assert_eq!(power::best_effort(&filled, 120), Some(250));
}

#[test]
fn test_merge_strategies_disagree_at_seams() {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
    let first = PowerTrace::from_values(start, &[vec![Some(0.0); 10], constant(400.0, 5)].concat());
    let second = PowerTrace::from_values(
        start + Duration::hours(3),
        &[constant(400.0, 5), vec![Some(0.0); 10]].concat(),
    );

    let builder = PowerCurveBuilder::new(PowerCurveSettings {
        window_sizes: vec![10],
        extended_window_sizes: vec![],
        merge_strategy: MergeStrategy::Concatenate,
    });

    let traces = [first, second];
    assert_eq!(builder.accumulate(&traces).power_at(10), Some(400));
    assert_eq!(
        builder.accumulate_with(&traces, MergeStrategy::PerTraceMax).power_at(10),
        Some(200)
    );
}
