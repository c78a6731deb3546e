//! Chart output port trait.

use crate::domain::clustering::AssetClusters;
use crate::domain::compound::ContributionPlan;
use crate::domain::error::FinlabError;
use crate::domain::frontier::EfficientFrontier;
use crate::domain::index_compare::IndexComparison;
use crate::domain::portfolio::Portfolio;

/// What a frontier chart shows besides the frontier itself.
#[derive(Debug, Clone)]
pub struct FrontierChart<'a> {
    pub frontier: &'a EfficientFrontier,
    /// Random portfolios drawn as a background cloud.
    pub random: &'a [Portfolio],
    pub risk_free_rate: f64,
}

/// Balance curve plotted against age.
#[derive(Debug, Clone)]
pub struct ProjectionChart<'a> {
    pub plan: &'a ContributionPlan,
    pub start_age: f64,
    pub years: f64,
    pub curve: &'a [(f64, f64)],
}

/// Port for writing analysis charts.
pub trait ReportPort {
    fn write_frontier(&self, chart: &FrontierChart<'_>, output_path: &str)
        -> Result<(), FinlabError>;

    fn write_projection(
        &self,
        chart: &ProjectionChart<'_>,
        output_path: &str,
    ) -> Result<(), FinlabError>;

    fn write_comparison(
        &self,
        comparison: &IndexComparison,
        output_path: &str,
    ) -> Result<(), FinlabError>;

    fn write_correlation(
        &self,
        clusters: &AssetClusters,
        output_path: &str,
    ) -> Result<(), FinlabError>;
}
