//! Descriptive statistics shared by the strategies
//!
//! All functions take plain value slices, oldest first. Empty input yields
//! `None` rather than NaN.

/// Population mean and standard deviation
pub fn mean_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    let mean = mean(values)?;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some((mean, variance.sqrt()))
}

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance
pub fn variance(values: &[f64]) -> Option<f64> {
    mean_std_dev(values).map(|(_, std_dev)| std_dev * std_dev)
}

/// Exponential moving average seeded at the oldest value
pub fn ema(values: &[f64], alpha: f64) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    Some(rest.iter().fold(*first, |acc, &x| alpha * x + (1.0 - alpha) * acc))
}

/// Least-squares slope of `values` against their index 0..n
///
/// Fewer than two points have no trend.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// First and third quartile of an ascending slice (index n/4 and 3n/4)
pub fn quartiles(sorted: &[f64]) -> Option<(f64, f64)> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    Some((sorted[n / 4], sorted[(3 * n / 4).min(n - 1)]))
}
