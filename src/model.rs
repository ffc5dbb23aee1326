//! Quartile thresholds and per-dimension letter grading

use std::fmt;
use std::str::FromStr;

use crate::data::CustomerMetrics;
use crate::error::{Result, RfvError};

/// Direction in which a metric is rewarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Lower is better: the lowest band grades A
    Ascending,
    /// Higher is better: the highest band grades A
    Descending,
}

impl Polarity {
    /// Map a band index (0 = at or below Q25 .. 3 = above Q75) to a grade
    fn grade_for_band(self, band: usize) -> Grade {
        const ASCENDING: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];
        const DESCENDING: [Grade; 4] = [Grade::D, Grade::C, Grade::B, Grade::A];
        match self {
            Polarity::Ascending => ASCENDING[band],
            Polarity::Descending => DESCENDING[band],
        }
    }
}

/// The three RFV dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Recency,
    Frequency,
    Value,
}

impl Metric {
    /// All metrics in composite-score order
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Value];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Value => "value",
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Metric::Recency => Polarity::Ascending,
            Metric::Frequency | Metric::Value => Polarity::Descending,
        }
    }

    /// Read this metric from a customer row
    pub fn of(self, customer: &CustomerMetrics) -> f64 {
        match self {
            Metric::Recency => customer.recency as f64,
            Metric::Frequency => customer.frequency as f64,
            Metric::Value => customer.value,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = RfvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recency" | "r" => Ok(Metric::Recency),
            "frequency" | "f" => Ok(Metric::Frequency),
            "value" | "v" => Ok(Metric::Value),
            _ => Err(RfvError::UnknownMetric {
                name: s.to_string(),
            }),
        }
    }
}

/// Letter grade for one dimension; A is best
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_char(self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<Grade> {
        match c {
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'C' => Some(Grade::C),
            'D' => Some(Grade::D),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 25th, 50th and 75th percentile cut points of one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

impl Quartiles {
    /// Band index of a value. Boundaries are inclusive: a value equal to a
    /// cut point belongs to the lower band.
    fn band(&self, value: f64) -> usize {
        if value <= self.q25 {
            0
        } else if value <= self.q50 {
            1
        } else if value <= self.q75 {
            2
        } else {
            3
        }
    }
}

/// Quartile cut points for every metric, computed once per run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuartileThresholds {
    pub recency: Quartiles,
    pub frequency: Quartiles,
    pub value: Quartiles,
}

impl QuartileThresholds {
    pub fn get(&self, metric: Metric) -> &Quartiles {
        match metric {
            Metric::Recency => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Value => &self.value,
        }
    }
}

/// Linearly interpolated percentile of an ascending-sorted slice
///
/// # Arguments
/// * `sorted` - Values sorted ascending
/// * `p` - Percentile as a fraction in `[0, 1]`
///
/// # Returns
/// * `None` for an empty slice
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = last as f64 * p.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = (position.ceil() as usize).min(last);

    let low_value = sorted[lower];
    let high_value = sorted[upper];
    let fraction = position - lower as f64;

    // Rounding must never push the result past the upper order statistic
    Some((low_value + (high_value - low_value) * fraction).min(high_value))
}

/// Compute quartile thresholds for every metric over the customer population
///
/// # Arguments
/// * `customers` - The full, merged customer metric set
///
/// # Returns
/// * `QuartileThresholds`, or `EmptyInput` when there are no customers
pub fn compute_quartiles(customers: &[CustomerMetrics]) -> Result<QuartileThresholds> {
    if customers.is_empty() {
        return Err(RfvError::EmptyInput);
    }

    let quartiles_of = |metric: Metric| -> Result<Quartiles> {
        let mut values: Vec<f64> = customers.iter().map(|c| metric.of(c)).collect();
        values.sort_by(f64::total_cmp);

        let at = |p: f64| percentile(&values, p).ok_or(RfvError::EmptyInput);
        Ok(Quartiles {
            q25: at(0.25)?,
            q50: at(0.50)?,
            q75: at(0.75)?,
        })
    };

    let thresholds = QuartileThresholds {
        recency: quartiles_of(Metric::Recency)?,
        frequency: quartiles_of(Metric::Frequency)?,
        value: quartiles_of(Metric::Value)?,
    };

    for metric in Metric::ALL {
        let q = thresholds.get(metric);
        log::debug!(
            "{metric} quartiles: q25={:.2} q50={:.2} q75={:.2}",
            q.q25,
            q.q50,
            q.q75
        );
    }

    Ok(thresholds)
}

/// Grade a metric value against the population thresholds
///
/// # Arguments
/// * `value` - The customer's value for `metric`
/// * `metric` - Which dimension is being graded; selects thresholds and polarity
/// * `thresholds` - Quartile cut points for the run
pub fn classify(value: f64, metric: Metric, thresholds: &QuartileThresholds) -> Grade {
    let band = thresholds.get(metric).band(value);
    metric.polarity().grade_for_band(band)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, recency: i64, frequency: u64, value: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            recency,
            frequency,
            value,
        }
    }

    fn uniform(q25: f64, q50: f64, q75: f64) -> QuartileThresholds {
        let q = Quartiles { q25, q50, q75 };
        QuartileThresholds {
            recency: q,
            frequency: q,
            value: q,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.25), Some(1.75));
        assert_eq!(percentile(&values, 0.5), Some(2.5));
        assert_eq!(percentile(&values, 0.75), Some(3.25));
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(4.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.75), Some(7.0));
    }

    #[test]
    fn test_compute_quartiles_single_customer_collapses() {
        let thresholds = compute_quartiles(&[customer("x", 0, 1, 100.0)]).unwrap();
        assert_eq!(
            thresholds.recency,
            Quartiles {
                q25: 0.0,
                q50: 0.0,
                q75: 0.0
            }
        );
        assert_eq!(thresholds.frequency.q50, 1.0);
        assert_eq!(thresholds.value.q75, 100.0);
    }

    #[test]
    fn test_compute_quartiles_empty_is_error() {
        assert!(matches!(compute_quartiles(&[]), Err(RfvError::EmptyInput)));
    }

    #[test]
    fn test_compute_quartiles_per_metric() {
        let customers = vec![
            customer("a", 40, 1, 10.0),
            customer("b", 10, 2, 20.0),
            customer("c", 30, 3, 40.0),
            customer("d", 20, 4, 30.0),
            customer("e", 0, 5, 50.0),
        ];
        let thresholds = compute_quartiles(&customers).unwrap();
        assert_eq!(thresholds.recency.q25, 10.0);
        assert_eq!(thresholds.recency.q50, 20.0);
        assert_eq!(thresholds.recency.q75, 30.0);
        assert_eq!(thresholds.frequency.q25, 2.0);
        assert_eq!(thresholds.value.q75, 40.0);
    }

    #[test]
    fn test_recency_grades_ascending() {
        let thresholds = uniform(10.0, 20.0, 30.0);
        assert_eq!(classify(-5.0, Metric::Recency, &thresholds), Grade::A);
        assert_eq!(classify(10.0, Metric::Recency, &thresholds), Grade::A);
        assert_eq!(classify(10.5, Metric::Recency, &thresholds), Grade::B);
        assert_eq!(classify(20.0, Metric::Recency, &thresholds), Grade::B);
        assert_eq!(classify(30.0, Metric::Recency, &thresholds), Grade::C);
        assert_eq!(classify(30.1, Metric::Recency, &thresholds), Grade::D);
    }

    #[test]
    fn test_frequency_and_value_grades_descending() {
        let thresholds = uniform(10.0, 20.0, 30.0);
        for metric in [Metric::Frequency, Metric::Value] {
            assert_eq!(classify(0.0, metric, &thresholds), Grade::D);
            assert_eq!(classify(10.0, metric, &thresholds), Grade::D);
            assert_eq!(classify(20.0, metric, &thresholds), Grade::C);
            assert_eq!(classify(30.0, metric, &thresholds), Grade::B);
            assert_eq!(classify(31.0, metric, &thresholds), Grade::A);
        }
    }

    #[test]
    fn test_degenerate_thresholds_split_in_two() {
        // Most customers bought exactly once
        let thresholds = uniform(1.0, 1.0, 1.0);
        assert_eq!(classify(1.0, Metric::Frequency, &thresholds), Grade::D);
        assert_eq!(classify(2.0, Metric::Frequency, &thresholds), Grade::A);
        assert_eq!(classify(1.0, Metric::Recency, &thresholds), Grade::A);
        assert_eq!(classify(2.0, Metric::Recency, &thresholds), Grade::D);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("Recency".parse::<Metric>().unwrap(), Metric::Recency);
        assert_eq!("f".parse::<Metric>().unwrap(), Metric::Frequency);
        assert_eq!(" value ".parse::<Metric>().unwrap(), Metric::Value);
        assert!(matches!(
            "monetary".parse::<Metric>(),
            Err(RfvError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn test_grade_chars() {
        for grade in [Grade::A, Grade::B, Grade::C, Grade::D] {
            assert_eq!(Grade::from_char(grade.as_char()), Some(grade));
        }
        assert_eq!(Grade::from_char('E'), None);
        assert!(Grade::A < Grade::D);
    }
}
