//! Small numeric helpers for daily cumulative series.
//!
//! Values are `f64` so that gaps can be carried as `NaN`; gaps propagate
//! through [`diff`] and [`moving_average`] rather than being skipped.

/// Differences between consecutive values; one shorter than the input.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Trailing mean over `window` values, computed from the running sum.
///
/// The output has `values.len() - window + 1` entries, the first being the
/// mean of `values[..window]`. Empty when there are fewer than `window`
/// values or `window` is zero.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }

    let cumulative: Vec<f64> = values
        .iter()
        .scan(0.0, |sum, v| {
            *sum += v;
            Some(*sum)
        })
        .collect();

    let n = window as f64;
    (window - 1..values.len())
        .map(|i| {
            let lead = if i >= window { cumulative[i - window] } else { 0.0 };
            (cumulative[i] - lead) / n
        })
        .collect()
}

/// Fill `NaN` gaps in place, in index order.
///
/// An interior gap takes the mean of its neighbours, the last value takes
/// its predecessor and the first value takes its successor. Because gaps are
/// filled front to back, a run of gaps is filled from the left.
pub fn interpolate_missing(values: &mut [f64]) {
    let len = values.len();
    for i in 0..len {
        if !values[i].is_nan() {
            continue;
        }
        values[i] = if i > 0 && i + 1 < len {
            (values[i - 1] + values[i + 1]) / 2.0
        } else if i > 0 {
            values[i - 1]
        } else if i + 1 < len {
            values[i + 1]
        } else {
            values[i]
        };
    }
}

/// Differences of integer series, for NYT totals.
pub fn diff_i64(values: &[i64]) -> Vec<i64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
