//! Descriptive statistics for stage reports.

use std::fmt;

/// count / mean / std / min / quartiles / max of a numeric column,
/// ignoring missing values. `std` is the sample standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Describe {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut data: Vec<f64> = values
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect();
        data.sort_by(f64::total_cmp);

        let count = data.len();
        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q1: f64::NAN,
                median: f64::NAN,
                q3: f64::NAN,
                max: f64::NAN,
            };
        }

        let mean = data.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let ss: f64 = data.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            count,
            mean,
            std,
            min: data[0],
            q1: quantile(&data, 0.25),
            median: quantile(&data, 0.50),
            q3: quantile(&data, 0.75),
            max: data[count - 1],
        }
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count  {:>12}", self.count)?;
        writeln!(f, "mean   {:>12.6}", self.mean)?;
        writeln!(f, "std    {:>12.6}", self.std)?;
        writeln!(f, "min    {:>12.6}", self.min)?;
        writeln!(f, "25%    {:>12.6}", self.q1)?;
        writeln!(f, "50%    {:>12.6}", self.median)?;
        writeln!(f, "75%    {:>12.6}", self.q3)?;
        write!(f, "max    {:>12.6}", self.max)
    }
}

/// `part / total` as a percentage; 0 for an empty table.
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
