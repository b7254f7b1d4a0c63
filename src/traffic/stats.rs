use crate::structs::{ColumnStats, Histogram, Result, TrafficError};

/// Default bin count for traffic histograms
pub const DEFAULT_BINS: usize = 10;

impl ColumnStats {
    /// Count, mean, sample standard deviation, min, quartiles and max of `values`
    ///
    /// # Errors
    /// Returns error if values is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn describe(name: &str, values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(TrafficError::Stats(format!(
                "Cannot describe empty column {name}"
            )));
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;

        let std_dev = if count < 2 {
            f64::NAN
        } else {
            let ss = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            name: name.to_string(),
            count,
            mean,
            std_dev,
            min: sorted[0],
            q1: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q3: percentile(&sorted, 75.0),
            max: sorted[count - 1],
        })
    }
}

/// Calculate percentile using linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}

impl Histogram {
    /// Equal-width histogram over [min, max]; the last bin is closed on the right.
    ///
    /// A constant column is spread over [v - 0.5, v + 0.5].
    ///
    /// # Errors
    /// Returns error if values is empty or `bins` is zero
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn build(column: &str, values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(TrafficError::Config("histogram needs at least one bin".into()));
        }
        if values.is_empty() {
            return Err(TrafficError::Stats(format!(
                "Cannot build histogram of empty column {column}"
            )));
        }

        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self {
            column: column.to_string(),
            edges,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = ColumnStats::describe("test", &values).expect("describe");

        assert_eq!(stats.count, 10);
        assert!((stats.mean - 5.5).abs() < 1e-12);
        assert!((stats.std_dev - 3.027_650_354).abs() < 1e-6);
        assert!((stats.min - 1.0).abs() < 1e-12);
        assert!((stats.q1 - 3.25).abs() < 1e-12);
        assert!((stats.median - 5.5).abs() < 1e-12);
        assert!((stats.q3 - 7.75).abs() < 1e-12);
        assert!((stats.max - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_describe_single_value() {
        let stats = ColumnStats::describe("v", &[4200.0]).expect("describe");

        assert_eq!(stats.mean, 4200.0);
        assert!(stats.std_dev.is_nan());
        assert_eq!(stats.median, 4200.0);
    }

    #[test]
    fn test_describe_empty_is_error() {
        assert!(ColumnStats::describe("v", &[]).is_err());
    }

    #[test]
    fn test_histogram() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let hist = Histogram::build("v", &values, 5).expect("histogram");

        assert_eq!(hist.edges, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        // max lands in the last bin
        assert_eq!(hist.counts, vec![2, 2, 2, 2, 3]);
        assert_eq!(hist.counts.iter().sum::<usize>(), values.len());
    }

    #[test]
    fn test_histogram_constant_column() {
        let hist = Histogram::build("v", &[3.0, 3.0], 2).expect("histogram");

        assert_eq!(hist.edges, vec![2.5, 3.0, 3.5]);
        assert_eq!(hist.counts, vec![0, 2]);
    }

    #[test]
    fn test_histogram_rejects_zero_bins() {
        assert!(matches!(
            Histogram::build("v", &[1.0], 0),
            Err(TrafficError::Config(_))
        ));
    }
}
