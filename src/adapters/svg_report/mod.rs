//! SVG chart reports.
//!
//! Each report is a single standalone `.svg` file built from the line-chart
//! helpers in [`chart_svg`] or the correlation grid in [`heatmap`].

pub mod chart_svg;
pub mod heatmap;

use crate::domain::clustering::AssetClusters;
use crate::domain::error::FinlabError;
use crate::domain::index_compare::IndexComparison;
use crate::ports::report_port::{FrontierChart, ProjectionChart, ReportPort};
use chart_svg::{render_chart, Chart, Highlight, Series, SeriesStyle};
use std::fs;
use std::path::Path;
use tracing::debug;

pub struct SvgReportAdapter;

impl SvgReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_svg(svg: String, output_path: &str) -> Result<(), FinlabError> {
    if svg.is_empty() {
        return Err(FinlabError::invalid_input(format!(
            "nothing to plot for {output_path}"
        )));
    }
    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, svg)?;
    debug!("wrote chart {}", path.display());
    Ok(())
}

pub fn frontier_chart(chart: &FrontierChart<'_>) -> Chart {
    let frontier = chart.frontier;
    let mut series = Vec::new();
    if !chart.random.is_empty() {
        series.push(Series {
            label: "Random Portfolios".into(),
            points: chart
                .random
                .iter()
                .map(|p| (p.volatility, p.expected_return))
                .collect(),
            color: "#7f7f7f",
            style: SeriesStyle::Scatter,
        });
    }
    series.push(Series {
        label: "Efficient Frontier".into(),
        points: frontier
            .points
            .iter()
            .map(|p| (p.portfolio.volatility, p.portfolio.expected_return))
            .collect(),
        color: "#d4b000",
        style: SeriesStyle::LineMarkers,
    });

    let mut highlights = Vec::new();
    let mut notes = Vec::new();
    if let Some(p) = frontier.min_risk() {
        highlights.push(Highlight {
            label: "Min-Risk Portfolio".into(),
            x: p.portfolio.volatility,
            y: p.portfolio.expected_return,
            color: "red",
        });
    }
    if let Some(p) = frontier.max_return() {
        highlights.push(Highlight {
            label: "Max-Return Portfolio".into(),
            x: p.portfolio.volatility,
            y: p.portfolio.expected_return,
            color: "green",
        });
    }
    if let Some(p) = frontier.max_sharpe(chart.risk_free_rate) {
        highlights.push(Highlight {
            label: "Max Sharpe Portfolio".into(),
            x: p.portfolio.volatility,
            y: p.portfolio.expected_return,
            color: "black",
        });
        notes.push(format!(
            "Max Sharpe: return {:.3}, volatility {:.3}, ratio {:.3}",
            p.portfolio.expected_return,
            p.portfolio.volatility,
            p.portfolio.sharpe_ratio(chart.risk_free_rate)
        ));
    }
    if !frontier.skipped.is_empty() {
        notes.push(format!("{} target returns had no solution", frontier.skipped.len()));
    }

    Chart {
        title: "Efficient Frontier".into(),
        x_label: "Volatility (Standard Deviation)".into(),
        y_label: "Expected Return".into(),
        series,
        highlights,
        x_bounds_text: None,
        notes,
    }
}

pub fn projection_chart(chart: &ProjectionChart<'_>) -> Chart {
    let plan = chart.plan;
    let balance = plan.future_value(chart.years);
    Chart {
        title: format!("Estimated Balance: ~ ${balance:.2}"),
        x_label: "Age (yr)".into(),
        y_label: "Total Savings ($)".into(),
        series: vec![Series {
            label: format!("APY: {:.2}% (avg)", plan.annual_rate * 100.0),
            points: chart
                .curve
                .iter()
                .map(|&(t, v)| (chart.start_age + t, v))
                .collect(),
            color: "red",
            style: SeriesStyle::Line,
        }],
        highlights: Vec::new(),
        x_bounds_text: None,
        notes: vec![
            format!(
                "Annual Contributions: ${:.2}/yr",
                plan.effective_contribution()
            ),
            format!("Total years lapsed: {} yrs", chart.years),
        ],
    }
}

pub fn comparison_chart(comparison: &IndexComparison) -> Chart {
    let origin = comparison.dates.first().copied();
    let day_offsets: Vec<f64> = comparison
        .dates
        .iter()
        .map(|d| origin.map_or(0.0, |o| (*d - o).num_days() as f64))
        .collect();
    let pair = |levels: &[f64]| -> Vec<(f64, f64)> {
        day_offsets.iter().copied().zip(levels.iter().copied()).collect()
    };

    Chart {
        title: format!("{} vs {} Performance", comparison.security, comparison.index),
        x_label: "Date".into(),
        y_label: "Normalized Price (Start = 100)".into(),
        series: vec![
            Series {
                label: comparison.security.clone(),
                points: pair(&comparison.security_levels),
                color: "#1f77b4",
                style: SeriesStyle::Line,
            },
            Series {
                label: comparison.index.clone(),
                points: pair(&comparison.index_levels),
                color: "#ff7f0e",
                style: SeriesStyle::Dashed,
            },
        ],
        highlights: Vec::new(),
        x_bounds_text: match (comparison.dates.first(), comparison.dates.last()) {
            (Some(first), Some(last)) => Some((first.to_string(), last.to_string())),
            _ => None,
        },
        notes: vec![format!(
            "Excess return: {:+.2}%",
            comparison.excess_return() * 100.0
        )],
    }
}

impl ReportPort for SvgReportAdapter {
    fn write_frontier(
        &self,
        chart: &FrontierChart<'_>,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        write_svg(render_chart(&frontier_chart(chart)), output_path)
    }

    fn write_projection(
        &self,
        chart: &ProjectionChart<'_>,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        write_svg(render_chart(&projection_chart(chart)), output_path)
    }

    fn write_comparison(
        &self,
        comparison: &IndexComparison,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        write_svg(render_chart(&comparison_chart(comparison)), output_path)
    }

    fn write_correlation(
        &self,
        clusters: &AssetClusters,
        output_path: &str,
    ) -> Result<(), FinlabError> {
        let svg = heatmap::render_cluster_map("Correlation Matrix Heatmap", clusters);
        write_svg(svg, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clustering::cluster_assets;
    use crate::domain::compound::ContributionPlan;
    use crate::domain::frontier::{efficient_frontier, FrontierOptions};
    use crate::domain::returns::ReturnSeries;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn series() -> ReturnSeries {
        let rows = vec![
            vec![0.02, 0.05, 0.01],
            vec![0.01, -0.02, 0.03],
            vec![-0.01, 0.04, 0.02],
            vec![0.03, 0.01, -0.01],
            vec![0.02, -0.03, 0.04],
        ];
        let labels = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        ReturnSeries::from_rows(labels, &rows).unwrap()
    }

    #[test]
    fn frontier_chart_marks_key_portfolios() {
        let frontier = efficient_frontier(&series(), &FrontierOptions::default()).unwrap();
        let chart = frontier_chart(&FrontierChart {
            frontier: &frontier,
            random: &[],
            risk_free_rate: 0.0,
        });

        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points.len(), 100);
        let labels: Vec<&str> = chart.highlights.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Min-Risk Portfolio", "Max-Return Portfolio", "Max Sharpe Portfolio"]
        );
    }

    #[test]
    fn write_frontier_creates_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("charts/frontier.svg");
        let frontier = efficient_frontier(&series(), &FrontierOptions::default()).unwrap();

        SvgReportAdapter::new()
            .write_frontier(
                &FrontierChart {
                    frontier: &frontier,
                    random: &[],
                    risk_free_rate: 0.005,
                },
                output.to_str().unwrap(),
            )
            .unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        assert!(contents.contains("<svg"));
        assert!(contents.contains("Efficient Frontier"));
    }

    #[test]
    fn projection_chart_offsets_by_start_age() {
        let plan = ContributionPlan {
            principal: 5000.0,
            annual_rate: 0.12,
            compounding: 1,
            annual_contribution: 6960.0,
            annual_limit: Some(7000.0),
        };
        let curve = plan.sample_curve(43.0, 10);
        let chart = projection_chart(&ProjectionChart {
            plan: &plan,
            start_age: 22.0,
            years: 43.0,
            curve: &curve,
        });

        assert_eq!(chart.series[0].points[0], (22.0, 5000.0));
        assert_eq!(chart.series[0].points[9].0, 65.0);
        assert!(chart.series[0].label.contains("12.00%"));
    }

    #[test]
    fn comparison_chart_uses_day_offsets() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let comparison = IndexComparison {
            security: "QQQ".into(),
            index: "^NDX".into(),
            dates: vec![d("2023-01-03"), d("2023-01-13")],
            security_levels: vec![100.0, 104.0],
            index_levels: vec![100.0, 103.0],
        };
        let chart = comparison_chart(&comparison);

        assert_eq!(chart.series[1].points, vec![(0.0, 100.0), (10.0, 103.0)]);
        assert_eq!(chart.series[1].style, SeriesStyle::Dashed);
        assert_eq!(
            chart.x_bounds_text,
            Some(("2023-01-03".to_string(), "2023-01-13".to_string()))
        );
        assert_eq!(chart.notes, vec!["Excess return: +1.00%".to_string()]);
    }

    #[test]
    fn write_correlation_creates_heatmap() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("corr.svg");
        let clusters = cluster_assets(&series(), 2).unwrap();

        SvgReportAdapter::new()
            .write_correlation(&clusters, output.to_str().unwrap())
            .unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        assert!(contents.contains("Correlation Matrix Heatmap"));
        assert_eq!(contents.matches("<rect x=").count(), 9);
        assert_eq!(contents.matches(r#"class="dendrogram""#).count(), 2);
    }

    #[test]
    fn empty_chart_is_not_written() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("empty.svg");
        let err = write_svg(String::new(), output.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FinlabError::InvalidInput { .. }));
        assert!(!output.exists());
    }
}
