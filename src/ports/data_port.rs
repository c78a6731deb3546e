//! Price data port trait.

use crate::domain::error::FinlabError;
use crate::domain::prices::PricePoint;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Closing prices for `ticker` within `[start_date, end_date]`, sorted by date.
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FinlabError>;

    /// Tickers this source can serve.
    fn list_tickers(&self) -> Result<Vec<String>, FinlabError>;
}
