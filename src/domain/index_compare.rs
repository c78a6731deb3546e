//! Relative performance of a security against a benchmark index.

use crate::domain::error::FinlabError;
use crate::domain::prices::PriceTable;
use chrono::NaiveDate;

/// Base level every normalized series starts from.
pub const NORMALIZED_BASE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexComparison {
    pub security: String,
    pub index: String,
    pub dates: Vec<NaiveDate>,
    pub security_levels: Vec<f64>,
    pub index_levels: Vec<f64>,
}

impl IndexComparison {
    /// Total return over the window, as a fraction.
    pub fn security_return(&self) -> f64 {
        total_return(&self.security_levels)
    }

    pub fn index_return(&self) -> f64 {
        total_return(&self.index_levels)
    }

    /// Security total return minus index total return.
    pub fn excess_return(&self) -> f64 {
        self.security_return() - self.index_return()
    }
}

fn total_return(levels: &[f64]) -> f64 {
    match levels.last() {
        Some(last) => last / NORMALIZED_BASE - 1.0,
        None => 0.0,
    }
}

/// Rescales `prices` so the first value is 100.
pub fn normalize(prices: &[f64]) -> Result<Vec<f64>, FinlabError> {
    let Some(&first) = prices.first() else {
        return Ok(Vec::new());
    };
    if !(first.is_finite() && first > 0.0) {
        return Err(FinlabError::invalid_input(format!(
            "cannot normalize from starting price {first}"
        )));
    }
    Ok(prices.iter().map(|p| p / first * NORMALIZED_BASE).collect())
}

/// Normalizes both columns of `table` after filling gaps.
pub fn compare_to_index(
    table: &PriceTable,
    security: &str,
    index: &str,
) -> Result<IndexComparison, FinlabError> {
    let mut filled = table.clone();
    filled.fill_missing();

    let closes = |ticker: &str| -> Result<Vec<f64>, FinlabError> {
        let column = filled.column(ticker).ok_or_else(|| FinlabError::NoData {
            ticker: ticker.to_string(),
        })?;
        let values: Vec<f64> = column.iter().flatten().copied().collect();
        if values.is_empty() || values.len() != column.len() {
            return Err(FinlabError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(values)
    };

    let security_levels = normalize(&closes(security)?)?;
    let index_levels = normalize(&closes(index)?)?;

    Ok(IndexComparison {
        security: security.to_string(),
        index: index.to_string(),
        dates: filled.dates().to_vec(),
        security_levels,
        index_levels,
    })
}
