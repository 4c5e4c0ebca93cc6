use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use effortrs::config::PowerCurveSettings;
use effortrs::ekg::EkgAnalyzer;
use effortrs::models::{EkgTrace, PowerTrace};
use effortrs::power::{self, MergeStrategy};

/// Benchmarks for the signal analyses over realistic recording lengths

fn synthetic_ekg(seconds: usize) -> EkgTrace {
    let len = seconds * 500;
    let voltages = (0..len)
        .map(|i| {
            let offset = i % 360;
            0.3 * (i as f64 / 300.0).sin() + 100.0 * (-(offset as f64).powi(2) / 18.0).exp()
        })
        .collect();
    EkgTrace::with_sample_rate(voltages, 500.0)
}

fn synthetic_power(seconds: usize, phase: f64) -> Vec<Option<f64>> {
    (0..seconds)
        .map(|i| Some(200.0 + 80.0 * ((i as f64 / 97.0) + phase).sin()))
        .collect()
}

fn bench_peak_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("EKG Analysis");
    let analyzer = EkgAnalyzer::default();

    // 1 to 10 minute recordings at 500 Hz
    for &seconds in &[60, 300, 600] {
        let trace = synthetic_ekg(seconds);

        group.throughput(Throughput::Elements(trace.len() as u64));
        group.bench_with_input(BenchmarkId::new("find_peaks", seconds), &trace, |b, trace| {
            b.iter(|| analyzer.find_trace_peaks(black_box(trace)));
        });
        group.bench_with_input(
            BenchmarkId::new("heart_rate_series", seconds),
            &trace,
            |b, trace| {
                b.iter(|| analyzer.heart_rate_series(black_box(trace)));
            },
        );
    }

    group.finish();
}

fn bench_power_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("Power Curve");
    let windows = PowerCurveSettings::default().windows(true);

    // 30 min to 4 hours at 1 Hz
    for &seconds in &[1800, 3600, 7200, 14400] {
        let values = synthetic_power(seconds, 0.0);

        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(
            BenchmarkId::new("build_power_curve", seconds),
            &values,
            |b, values| {
                b.iter(|| power::build_power_curve(black_box(values), &windows));
            },
        );
    }

    group.finish();
}

fn bench_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Accumulation");
    let windows = PowerCurveSettings::default().windows(false);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();

    for &activities in &[5usize, 20, 50] {
        let traces: Vec<PowerTrace> = (0..activities)
            .map(|i| {
                PowerTrace::from_values(
                    start + Duration::days(i as i64),
                    &synthetic_power(3600, i as f64),
                )
            })
            .collect();

        for strategy in [MergeStrategy::Concatenate, MergeStrategy::PerTraceMax] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), activities),
                &traces,
                |b, traces| {
                    b.iter(|| power::accumulate_power_curve_with(black_box(traces), &windows, strategy));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_peak_detection, bench_power_curve, bench_accumulation);
criterion_main!(benches);
