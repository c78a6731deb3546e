//! Portfolio evaluation and random long-only portfolio sampling.

use crate::domain::error::FinlabError;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Exp1};

/// A weight vector with its expected return and volatility.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
}

impl Portfolio {
    /// Evaluates `weights` against the expected-return vector and covariance matrix.
    pub fn evaluate(
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<Self, FinlabError> {
        check_dimensions(expected_returns, covariance)?;
        if weights.len() != expected_returns.len() {
            return Err(FinlabError::DimensionMismatch {
                context: "portfolio weights".into(),
                expected: expected_returns.len(),
                found: weights.len(),
            });
        }
        Ok(Self::evaluate_unchecked(weights, expected_returns, covariance))
    }

    pub(crate) fn evaluate_unchecked(
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Self {
        let variance = weights.dot(&(covariance * weights));
        Self {
            weights: weights.iter().copied().collect(),
            expected_return: weights.dot(expected_returns),
            // rounding can leave a tiny negative variance at the zero-risk point
            volatility: variance.max(0.0).sqrt(),
        }
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn sharpe_ratio(&self, risk_free_rate: f64) -> f64 {
        sharpe_ratio(self.expected_return, self.volatility, risk_free_rate)
    }
}

/// (return - rf) / volatility, or 0 for a riskless portfolio.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility > 0.0 {
        (expected_return - risk_free_rate) / volatility
    } else {
        0.0
    }
}

pub(crate) fn check_dimensions(
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<(), FinlabError> {
    let n = expected_returns.len();
    if covariance.nrows() != n {
        return Err(FinlabError::DimensionMismatch {
            context: "covariance rows".into(),
            expected: n,
            found: covariance.nrows(),
        });
    }
    if covariance.ncols() != n {
        return Err(FinlabError::DimensionMismatch {
            context: "covariance columns".into(),
            expected: n,
            found: covariance.ncols(),
        });
    }
    Ok(())
}

/// Generates a random weight vector that sums to 1.0 (flat Dirichlet via Exp(1) draws).
pub fn random_weights(n: usize, rng: &mut impl Rng) -> DVector<f64> {
    let raw: Vec<f64> = (0..n).map(|_| Exp1.sample(rng)).collect();
    let sum: f64 = raw.iter().sum();
    if sum > 0.0 {
        DVector::from_iterator(n, raw.into_iter().map(|v| v / sum))
    } else {
        DVector::from_element(n, 1.0 / n as f64)
    }
}

/// Samples `count` random long-only portfolios, in generation order.
pub fn random_portfolios(
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Portfolio>, FinlabError> {
    check_dimensions(expected_returns, covariance)?;
    let n = expected_returns.len();
    Ok((0..count)
        .map(|_| {
            let w = random_weights(n, &mut *rng);
            Portfolio::evaluate_unchecked(&w, expected_returns, covariance)
        })
        .collect())
}
