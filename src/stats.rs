//! Windowed statistics helpers shared by the EKG and power analyses
//!
//! All helpers are pure functions over slices. Missing samples are modelled as
//! `None`; a NaN handed in by a caller is treated the same way.

use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample standard deviation (n - 1 denominator), `None` below two samples
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().std_dev())
}

/// Normalize an optional sample so NaN counts as missing
#[inline]
pub fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Rolling mean over every full window of `window` consecutive samples.
///
/// The result has one entry per window position (`len - window + 1`
/// entries). A window that contains a missing sample yields `None`; missing
/// samples are never read as zero. Returns an empty vector when the window is
/// zero or longer than the series.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if window == 0 || window > n {
        return Vec::new();
    }

    // Prefix sums of present values and of missing-sample counts
    let mut sums = Vec::with_capacity(n + 1);
    let mut gaps = Vec::with_capacity(n + 1);
    sums.push(0.0f64);
    gaps.push(0usize);
    for value in values {
        let (sum, gap) = match present(*value) {
            Some(v) => (v, 0),
            None => (0.0, 1),
        };
        sums.push(sums[sums.len() - 1] + sum);
        gaps.push(gaps[gaps.len() - 1] + gap);
    }

    (window..=n)
        .map(|end| {
            let start = end - window;
            if gaps[end] - gaps[start] > 0 {
                None
            } else {
                Some((sums[end] - sums[start]) / window as f64)
            }
        })
        .collect()
}

/// Largest rolling mean across the series, if any window is gap-free
pub fn max_rolling_mean(values: &[Option<f64>], window: usize) -> Option<f64> {
    rolling_mean(values, window)
        .into_iter()
        .flatten()
        .fold(None, |best: Option<f64>, mean| match best {
            Some(b) if b >= mean => Some(b),
            _ => Some(mean),
        })
}

/// Forward fill, then back fill, missing samples.
///
/// Leading gaps take the first present value; a series with no present value
/// is returned unchanged.
pub fn fill_gaps(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut filled: Vec<Option<f64>> = values.iter().map(|v| present(*v)).collect();

    let mut last = None;
    for slot in filled.iter_mut() {
        match slot {
            Some(v) => last = Some(*v),
            None => *slot = last,
        }
    }

    let mut next = None;
    for slot in filled.iter_mut().rev() {
        match slot {
            Some(v) => next = Some(*v),
            None => *slot = next,
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));

        // Sample standard deviation: sqrt(32 / 7)
        let std = sample_std_dev(&values).unwrap();
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
    }

    #[test]
    fn test_rolling_mean_full_windows() {
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0].iter().map(|&v| Some(v)).collect();
        let means = rolling_mean(&values, 2);
        assert_eq!(means, vec![Some(1.5), Some(2.5), Some(3.5)]);

        assert!(rolling_mean(&values, 0).is_empty());
        assert!(rolling_mean(&values, 5).is_empty());
    }

    #[test]
    fn test_rolling_mean_skips_windows_with_gaps() {
        let values = vec![Some(10.0), None, Some(30.0), Some(50.0), Some(f64::NAN)];
        let means = rolling_mean(&values, 2);
        assert_eq!(means, vec![None, None, Some(40.0), None]);
        assert_eq!(max_rolling_mean(&values, 2), Some(40.0));
        assert_eq!(max_rolling_mean(&values, 4), None);
    }

    #[test]
    fn test_fill_gaps() {
        let values = vec![None, Some(100.0), None, None, Some(200.0), None];
        let filled = fill_gaps(&values);
        assert_eq!(
            filled,
            vec![
                Some(100.0),
                Some(100.0),
                Some(100.0),
                Some(100.0),
                Some(200.0),
                Some(200.0)
            ]
        );

        let empty = vec![None, None];
        assert_eq!(fill_gaps(&empty), vec![None, None]);
    }
}
