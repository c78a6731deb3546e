//! Per-period return series and the moments derived from them.

use crate::domain::error::FinlabError;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

/// Periods × assets matrix of simple returns.
///
/// `periods` is empty when the series was built from bare rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    labels: Vec<String>,
    periods: Vec<NaiveDate>,
    values: DMatrix<f64>,
}

/// A return cell flagged by [`ReturnSeries::outliers`].
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier {
    pub asset: String,
    pub period: usize,
    pub value: f64,
}

impl ReturnSeries {
    pub fn new(
        labels: Vec<String>,
        periods: Vec<NaiveDate>,
        values: DMatrix<f64>,
    ) -> Result<Self, FinlabError> {
        if labels.len() != values.ncols() {
            return Err(FinlabError::DimensionMismatch {
                context: "return series labels".into(),
                expected: values.ncols(),
                found: labels.len(),
            });
        }
        if !periods.is_empty() && periods.len() != values.nrows() {
            return Err(FinlabError::DimensionMismatch {
                context: "return series periods".into(),
                expected: values.nrows(),
                found: periods.len(),
            });
        }
        if let Some((i, j)) = (0..values.nrows())
            .flat_map(|i| (0..values.ncols()).map(move |j| (i, j)))
            .find(|&(i, j)| !values[(i, j)].is_finite())
        {
            return Err(FinlabError::invalid_input(format!(
                "non-finite return for {} at period {}",
                labels[j], i
            )));
        }
        Ok(Self {
            labels,
            periods,
            values,
        })
    }

    /// Builds a series from per-period rows, one value per asset.
    pub fn from_rows(labels: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, FinlabError> {
        let ncols = labels.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(FinlabError::DimensionMismatch {
                context: "return row".into(),
                expected: ncols,
                found: bad.len(),
            });
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(labels, Vec::new(), values)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    /// Labels must be non-empty and unique.
    pub fn check_labels(&self) -> Result<(), FinlabError> {
        let mut seen = HashSet::new();
        for label in &self.labels {
            if label.trim().is_empty() {
                return Err(FinlabError::InvalidLabels {
                    reason: "empty asset label".into(),
                });
            }
            if !seen.insert(label.as_str()) {
                return Err(FinlabError::InvalidLabels {
                    reason: format!("duplicate asset label '{label}'"),
                });
            }
        }
        Ok(())
    }

    /// Mean return per asset.
    pub fn expected_returns(&self) -> Result<DVector<f64>, FinlabError> {
        let n = self.n_periods();
        if n == 0 {
            return Err(FinlabError::InsufficientData {
                what: "return periods".into(),
                required: 1,
                actual: 0,
            });
        }
        Ok(DVector::from_fn(self.n_assets(), |j, _| {
            self.values.column(j).iter().sum::<f64>() / n as f64
        }))
    }

    /// Sample covariance (divisor n - 1).
    pub fn covariance(&self) -> Result<DMatrix<f64>, FinlabError> {
        let n = self.n_periods();
        if n < 2 {
            return Err(FinlabError::InsufficientData {
                what: "return periods".into(),
                required: 2,
                actual: n,
            });
        }
        let means = self.expected_returns()?;
        let centered = DMatrix::from_fn(n, self.n_assets(), |i, j| self.values[(i, j)] - means[j]);
        Ok(centered.transpose() * &centered / (n - 1) as f64)
    }

    /// Pearson correlation. A zero-variance asset correlates with nothing but itself.
    pub fn correlation(&self) -> Result<DMatrix<f64>, FinlabError> {
        let cov = self.covariance()?;
        let k = cov.nrows();
        let std: Vec<f64> = (0..k).map(|i| cov[(i, i)].max(0.0).sqrt()).collect();
        Ok(DMatrix::from_fn(k, k, |i, j| {
            if i == j {
                1.0
            } else if std[i] > 0.0 && std[j] > 0.0 {
                (cov[(i, j)] / (std[i] * std[j])).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }))
    }

    /// Cells whose absolute return exceeds `limit`.
    pub fn outliers(&self, limit: f64) -> Vec<Outlier> {
        let mut found = Vec::new();
        for i in 0..self.n_periods() {
            for j in 0..self.n_assets() {
                let value = self.values[(i, j)];
                if value.abs() > limit {
                    found.push(Outlier {
                        asset: self.labels[j].clone(),
                        period: i,
                        value,
                    });
                }
            }
        }
        found
    }
}
