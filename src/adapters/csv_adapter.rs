//! CSV file price adapter.
//!
//! One file per ticker, `<base>/<TICKER>.csv`, with a header row naming a `date`
//! column and either an `adj_close` or a `close` column. Other columns are ignored.

use crate::domain::error::FinlabError;
use crate::domain::prices::PricePoint;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvPriceSource {
    base_path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn data_error(reason: String) -> FinlabError {
    FinlabError::Data { reason }
}

impl PriceSource for CsvPriceSource {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FinlabError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| {
            data_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error in {}: {}", path.display(), e)))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let date_col = column("date")
            .ok_or_else(|| data_error(format!("missing date column in {}", path.display())))?;
        let close_col = column("adj_close")
            .or_else(|| column("close"))
            .ok_or_else(|| data_error(format!("missing close column in {}", path.display())))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| data_error("missing date value".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| data_error(format!("invalid date '{}': {}", date_str, e)))?;

            if date < start_date || date > end_date {
                continue;
            }

            let raw = record.get(close_col).map(str::trim).unwrap_or("");
            // blank cells are gaps, filled later by the price table
            if raw.is_empty() {
                continue;
            }
            let close: f64 = raw
                .parse()
                .map_err(|e| data_error(format!("invalid close value '{}': {}", raw, e)))?;

            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(FinlabError::NoData {
                ticker: ticker.to_string(),
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, FinlabError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

/// Reads whitespace- or comma-separated tickers from a text file.
pub fn load_tickers(path: &Path) -> Result<Vec<String>, FinlabError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_tickers(&content))
}

pub fn parse_tickers(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
