#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use finlab::cli::DataConfig;
use finlab::domain::clustering::AssetClusters;
use finlab::domain::error::FinlabError;
use finlab::domain::index_compare::IndexComparison;
pub use finlab::domain::prices::PricePoint;
use finlab::ports::data_port::PriceSource;
use finlab::ports::report_port::{FrontierChart, ProjectionChart, ReportPort};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct MockPriceSource {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FinlabError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(FinlabError::Data {
                reason: reason.clone(),
            });
        }
        let points: Vec<PricePoint> = self
            .data
            .get(ticker)
            .map(|p| {
                p.iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if points.is_empty() {
            return Err(FinlabError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, FinlabError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Records what each report call received instead of writing files.
#[derive(Default)]
pub struct RecordingReport {
    pub frontier_points: RefCell<Option<usize>>,
    pub random_count: RefCell<Option<usize>>,
    pub projection_curve: RefCell<Vec<(f64, f64)>>,
    pub comparison: RefCell<Option<IndexComparison>>,
    pub clusters: RefCell<Option<AssetClusters>>,
    pub paths: RefCell<Vec<String>>,
}

impl RecordingReport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportPort for RecordingReport {
    fn write_frontier(
        &self,
        chart: &FrontierChart<'_>,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        *self.frontier_points.borrow_mut() = Some(chart.frontier.len());
        *self.random_count.borrow_mut() = Some(chart.random.len());
        self.paths.borrow_mut().push(output_path.to_string());
        Ok(())
    }

    fn write_projection(
        &self,
        chart: &ProjectionChart<'_>,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        *self.projection_curve.borrow_mut() = chart.curve.to_vec();
        self.paths.borrow_mut().push(output_path.to_string());
        Ok(())
    }

    fn write_comparison(
        &self,
        comparison: &IndexComparison,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        *self.comparison.borrow_mut() = Some(comparison.clone());
        self.paths.borrow_mut().push(output_path.to_string());
        Ok(())
    }

    fn write_correlation(
        &self,
        clusters: &AssetClusters,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        *self.clusters.borrow_mut() = Some(clusters.clone());
        self.paths.borrow_mut().push(output_path.to_string());
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily closes starting at `start`, one per calendar day.
pub fn daily_closes(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start.checked_add_days(Days::new(i as u64)).unwrap(),
            close,
        })
        .collect()
}

/// A smooth trend with a wobble; different `wobble` periods give series
/// that are correlated but not collinear.
pub fn synthetic_closes(days: usize, base: f64, drift: f64, amplitude: f64, wobble: f64) -> Vec<f64> {
    (0..days)
        .map(|t| {
            let t = t as f64;
            base * (1.0 + drift * t) * (1.0 + amplitude * (t / wobble).sin())
        })
        .collect()
}

/// Three assets over two calendar years of daily data.
pub fn three_asset_source() -> MockPriceSource {
    let start = date(2020, 1, 1);
    let days = 731;
    MockPriceSource::new()
        .with_closes(
            "AAA",
            daily_closes(start, &synthetic_closes(days, 100.0, 0.0004, 0.05, 23.0)),
        )
        .with_closes(
            "BBB",
            daily_closes(start, &synthetic_closes(days, 50.0, 0.0010, 0.12, 37.0)),
        )
        .with_closes(
            "CCC",
            daily_closes(start, &synthetic_closes(days, 20.0, 0.0002, 0.03, 11.0)),
        )
}

pub fn data_config(tickers: &[&str]) -> DataConfig {
    DataConfig {
        data_dir: PathBuf::from("unused"),
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        start_date: date(2020, 1, 1),
        end_date: date(2021, 12, 31),
    }
}
