//! Closing-price tables and their preprocessing.
//!
//! A [`PriceTable`] holds one column of closes per ticker on a unified date
//! timeline. Cells with no observation are `None` until [`PriceTable::fill_missing`]
//! runs. Resampling keeps the last observation of each calendar period.

use crate::domain::error::FinlabError;
use crate::domain::returns::ReturnSeries;
use chrono::{Datelike, NaiveDate};
use nalgebra::DMatrix;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Sampling frequency of a price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 252.0,
            Frequency::Monthly => 12.0,
            Frequency::Quarterly => 4.0,
        }
    }

    /// Calendar period key: (year, month) for monthly, (year, quarter) for quarterly.
    fn period_key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            Frequency::Daily => (date.year(), date.ordinal()),
            Frequency::Monthly => (date.year(), date.month()),
            Frequency::Quarterly => (date.year(), (date.month() - 1) / 3 + 1),
        }
    }

    /// Last calendar day of the period containing `date`.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        let last_month = match self {
            Frequency::Daily => return date,
            Frequency::Monthly => date.month(),
            Frequency::Quarterly => ((date.month() - 1) / 3 + 1) * 3,
        };
        let (year, month) = if last_month == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), last_month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.pred_opt())
            .unwrap_or(date)
    }
}

impl FromStr for Frequency {
    type Err = FinlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "monthly" | "m" | "me" => Ok(Frequency::Monthly),
            "quarterly" | "q" | "qe" => Ok(Frequency::Quarterly),
            other => Err(FinlabError::invalid_input(format!(
                "unknown frequency '{other}' (expected daily, monthly or quarterly)"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Aligns per-ticker histories on the union of their dates.
    pub fn from_histories(histories: Vec<(String, Vec<PricePoint>)>) -> Self {
        let timeline: BTreeSet<NaiveDate> = histories
            .iter()
            .flat_map(|(_, points)| points.iter().map(|p| p.date))
            .collect();
        let dates: Vec<NaiveDate> = timeline.into_iter().collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut tickers = Vec::with_capacity(histories.len());
        let mut columns = Vec::with_capacity(histories.len());
        for (ticker, points) in histories {
            let mut column = vec![None; dates.len()];
            for point in points {
                if let Some(&row) = row_of.get(&point.date) {
                    column[row] = Some(point.close);
                }
            }
            tickers.push(ticker);
            columns.push(column);
        }

        Self {
            tickers,
            dates,
            columns,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.tickers
            .iter()
            .zip(&self.columns)
            .map(|(t, col)| (t.clone(), col.iter().filter(|v| v.is_none()).count()))
            .collect()
    }

    /// Forward fill, then backward fill what is left at the head of each column.
    pub fn fill_missing(&mut self) {
        for column in &mut self.columns {
            let mut last = None;
            for cell in column.iter_mut() {
                match cell {
                    Some(v) => last = Some(*v),
                    None => *cell = last,
                }
            }
            let mut next = None;
            for cell in column.iter_mut().rev() {
                match cell {
                    Some(v) => next = Some(*v),
                    None => *cell = next,
                }
            }
        }
    }

    /// Last non-missing close per calendar period, labelled by period end.
    pub fn resample(&self, frequency: Frequency) -> PriceTable {
        if frequency == Frequency::Daily {
            return self.clone();
        }

        let mut groups: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
        for (row, date) in self.dates.iter().enumerate() {
            groups
                .entry(frequency.period_key(*date))
                .or_default()
                .push(row);
        }

        let mut dates = Vec::with_capacity(groups.len());
        let mut columns = vec![Vec::with_capacity(groups.len()); self.columns.len()];
        for rows in groups.values() {
            dates.push(frequency.period_end(self.dates[rows[0]]));
            for (col, out) in self.columns.iter().zip(columns.iter_mut()) {
                out.push(rows.iter().rev().find_map(|&r| col[r]));
            }
        }

        PriceTable {
            tickers: self.tickers.clone(),
            dates,
            columns,
        }
    }

    /// Simple returns between consecutive rows; the first row has no return and is dropped.
    pub fn pct_change(&self) -> Result<ReturnSeries, FinlabError> {
        for (ticker, count) in self.missing_counts() {
            if count > 0 {
                return Err(FinlabError::MissingValues { ticker, count });
            }
        }
        if self.dates.len() < 2 {
            return Err(FinlabError::InsufficientData {
                what: "price rows".into(),
                required: 2,
                actual: self.dates.len(),
            });
        }

        let periods = self.dates.len() - 1;
        let mut values = DMatrix::zeros(periods, self.columns.len());
        for (j, column) in self.columns.iter().enumerate() {
            for i in 0..periods {
                let prev = column[i].unwrap_or(f64::NAN);
                let curr = column[i + 1].unwrap_or(f64::NAN);
                if prev <= 0.0 {
                    return Err(FinlabError::invalid_input(format!(
                        "non-positive price {prev} for {} on {}",
                        self.tickers[j], self.dates[i]
                    )));
                }
                values[(i, j)] = curr / prev - 1.0;
            }
        }

        ReturnSeries::new(self.tickers.clone(), self.dates[1..].to_vec(), values)
    }
}
