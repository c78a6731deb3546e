//! Integration tests for the analysis pipelines.
//!
//! Tests cover:
//! - Price loading through the data port, including gaps and fetch errors
//! - Frontier pipeline end to end with a mock price source
//! - Cluster and index-comparison pipelines
//! - Bond yield and compound projection settings flowing into the domain

mod common;

use common::*;
use finlab::cli::{
    self, BondConfig, ClusterConfig, CompareConfig, CompoundConfig, FrontierConfig,
};
use finlab::domain::bond::bond_price;
use finlab::domain::compound::ContributionPlan;
use finlab::domain::error::FinlabError;
use finlab::domain::frontier::FrontierOptions;
use finlab::domain::prices::Frequency;
use std::path::PathBuf;

fn frontier_settings(long_only: bool, random: usize) -> FrontierConfig {
    FrontierConfig {
        options: FrontierOptions {
            points: 25,
            long_only,
            check_labels: true,
        },
        frequency: Frequency::Quarterly,
        risk_free_rate: 0.04,
        random_portfolios: random,
        seed: Some(7),
        output: PathBuf::from("out/frontier.svg"),
    }
}

mod price_loading {
    use super::*;

    #[test]
    fn table_aligns_histories_and_keeps_gaps() {
        let source = MockPriceSource::new()
            .with_closes(
                "AAA",
                vec![
                    PricePoint { date: date(2024, 1, 2), close: 10.0 },
                    PricePoint { date: date(2024, 1, 3), close: 11.0 },
                ],
            )
            .with_closes(
                "BBB",
                vec![PricePoint { date: date(2024, 1, 3), close: 20.0 }],
            );
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];

        let table =
            cli::load_price_table(&source, &tickers, date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        assert_eq!(table.dates(), &[date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(table.column("BBB").unwrap(), &[None, Some(20.0)]);
    }

    #[test]
    fn star_selects_every_ticker() {
        let source = three_asset_source();
        let table = cli::load_price_table(
            &source,
            &["*".to_string()],
            date(2020, 1, 1),
            date(2020, 1, 31),
        )
        .unwrap();
        assert_eq!(table.tickers(), &["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn fetch_error_propagates() {
        let source = three_asset_source().with_error("BBB", "disk on fire");
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        let err = cli::load_price_table(&source, &tickers, date(2020, 1, 1), date(2020, 12, 31))
            .unwrap_err();
        assert!(matches!(err, FinlabError::Data { .. }));
    }

    #[test]
    fn empty_ticker_list_is_insufficient_data() {
        let err = cli::load_price_table(
            &three_asset_source(),
            &[],
            date(2020, 1, 1),
            date(2020, 12, 31),
        )
        .unwrap_err();
        assert!(matches!(err, FinlabError::InsufficientData { .. }));
    }

    #[test]
    fn prepare_returns_fills_gaps_before_resampling() {
        let source = MockPriceSource::new()
            .with_closes(
                "AAA",
                vec![
                    PricePoint { date: date(2024, 1, 31), close: 10.0 },
                    PricePoint { date: date(2024, 2, 29), close: 11.0 },
                    PricePoint { date: date(2024, 3, 28), close: 12.1 },
                ],
            )
            .with_closes(
                "BBB",
                vec![
                    PricePoint { date: date(2024, 1, 31), close: 5.0 },
                    PricePoint { date: date(2024, 3, 28), close: 6.0 },
                ],
            );
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        let table =
            cli::load_price_table(&source, &tickers, date(2024, 1, 1), date(2024, 12, 31)).unwrap();

        let returns = cli::prepare_returns(&table, Frequency::Monthly).unwrap();

        assert_eq!(returns.n_periods(), 2);
        let values = returns.values();
        assert!((values[(0, 0)] - 0.1).abs() < 1e-12);
        assert!((values[(0, 1)]).abs() < 1e-12);
        assert!((values[(1, 1)] - 0.2).abs() < 1e-12);
    }
}

mod frontier_pipeline {
    use super::*;

    #[test]
    fn unconstrained_frontier_reaches_report() {
        let source = three_asset_source();
        let report = RecordingReport::new();
        let data = data_config(&["AAA", "BBB", "CCC"]);

        let frontier =
            cli::run_frontier_pipeline(&source, &report, &data, &frontier_settings(false, 0))
                .unwrap();

        assert_eq!(frontier.len(), 25);
        assert!(frontier.skipped.is_empty());
        assert_eq!(*report.frontier_points.borrow(), Some(25));
        assert_eq!(*report.random_count.borrow(), Some(0));
        assert_eq!(report.paths.borrow().as_slice(), &["out/frontier.svg"]);

        for point in &frontier.points {
            let sum: f64 = point.portfolio.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-8);
            assert!(point.portfolio.volatility >= frontier.min_volatility.volatility - 1e-10);
        }
    }

    #[test]
    fn long_only_frontier_has_no_short_positions() {
        let source = three_asset_source();
        let report = RecordingReport::new();
        let data = data_config(&["AAA", "BBB", "CCC"]);

        let frontier =
            cli::run_frontier_pipeline(&source, &report, &data, &frontier_settings(true, 50))
                .unwrap();

        assert!(!frontier.is_empty());
        for point in &frontier.points {
            assert!(point.portfolio.weights.iter().all(|&w| w >= -1e-9));
        }
        assert_eq!(*report.random_count.borrow(), Some(50));
    }

    #[test]
    fn single_asset_is_insufficient() {
        let source = three_asset_source();
        let report = RecordingReport::new();
        let err = cli::run_frontier_pipeline(
            &source,
            &report,
            &data_config(&["AAA"]),
            &frontier_settings(false, 0),
        )
        .unwrap_err();

        assert!(matches!(err, FinlabError::InsufficientData { .. }));
        assert!(report.paths.borrow().is_empty());
    }

    #[test]
    fn duplicate_series_is_singular() {
        let closes = synthetic_closes(731, 100.0, 0.0004, 0.05, 23.0);
        let source = MockPriceSource::new()
            .with_closes("AAA", daily_closes(date(2020, 1, 1), &closes))
            .with_closes("AAB", daily_closes(date(2020, 1, 1), &closes))
            .with_closes(
                "BBB",
                daily_closes(
                    date(2020, 1, 1),
                    &synthetic_closes(731, 50.0, 0.0010, 0.12, 37.0),
                ),
            );
        let err = cli::run_frontier_pipeline(
            &source,
            &RecordingReport::new(),
            &data_config(&["AAA", "AAB", "BBB"]),
            &frontier_settings(false, 0),
        )
        .unwrap_err();
        assert!(matches!(err, FinlabError::SingularCovariance));
    }
}

mod cluster_pipeline {
    use super::*;

    #[test]
    fn default_k_is_capped_by_asset_count() {
        let source = three_asset_source();
        let report = RecordingReport::new();
        let settings = ClusterConfig {
            k: None,
            frequency: Frequency::Monthly,
            output: PathBuf::from("corr.svg"),
        };

        let clusters =
            cli::run_cluster_pipeline(&source, &report, &data_config(&["AAA", "BBB", "CCC"]), &settings)
                .unwrap();

        let mut assignments = clusters.assignments.clone();
        assignments.sort();
        assert_eq!(assignments, vec![0, 1, 2]);
        assert_eq!(clusters.order.len(), 3);
        assert!(report.clusters.borrow().is_some());
    }

    #[test]
    fn single_cluster_groups_everything() {
        let settings = ClusterConfig {
            k: Some(1),
            frequency: Frequency::Monthly,
            output: PathBuf::from("corr.svg"),
        };
        let clusters = cli::run_cluster_pipeline(
            &three_asset_source(),
            &RecordingReport::new(),
            &data_config(&["AAA", "BBB", "CCC"]),
            &settings,
        )
        .unwrap();

        assert_eq!(clusters.groups().len(), 1);
        assert_eq!(clusters.groups()[0].len(), 3);
        for i in 0..3 {
            assert!((clusters.correlation[(i, i)] - 1.0).abs() < 1e-12);
        }
    }
}

mod compare_pipeline {
    use super::*;

    #[test]
    fn comparison_normalizes_both_series() {
        let source = three_asset_source();
        let report = RecordingReport::new();
        let settings = CompareConfig {
            security: "BBB".into(),
            index: "AAA".into(),
            output: PathBuf::from("cmp.svg"),
        };

        let comparison =
            cli::run_compare_pipeline(&source, &report, &data_config(&[]), &settings).unwrap();

        assert_eq!(comparison.security_levels[0], 100.0);
        assert_eq!(comparison.index_levels[0], 100.0);
        assert_eq!(comparison.dates.len(), 731);
        let recorded = report.comparison.borrow();
        assert_eq!(recorded.as_ref().map(|c| c.security.as_str()), Some("BBB"));
    }

    #[test]
    fn unknown_index_is_no_data() {
        let settings = CompareConfig {
            security: "AAA".into(),
            index: "^NDX".into(),
            output: PathBuf::from("cmp.svg"),
        };
        let err = cli::run_compare_pipeline(
            &three_asset_source(),
            &RecordingReport::new(),
            &data_config(&[]),
            &settings,
        )
        .unwrap_err();
        assert!(matches!(err, FinlabError::NoData { ref ticker } if ticker == "^NDX"));
    }
}

mod bond_and_compound {
    use super::*;

    #[test]
    fn default_bond_yield_reprices_to_market() {
        let settings = BondConfig::default();
        let solution = cli::run_yield_solver(&settings).unwrap();

        let price = bond_price(100.0, 6.0, 2, solution.yield_rate);
        assert!((price - 96.0).abs() < 1e-8);
        assert!(solution.yield_rate > 0.08 && solution.yield_rate < 0.085);
    }

    #[test]
    fn premium_price_outside_guesses_does_not_bracket() {
        let mut settings = BondConfig::default();
        settings.bond.market_price = 112.0;
        let err = cli::run_yield_solver(&settings).unwrap_err();
        assert!(matches!(err, FinlabError::NonBracketingInterval { .. }));
    }

    #[test]
    fn compound_projection_matches_discrete_balance() {
        let plan = ContributionPlan {
            principal: 1000.0,
            annual_rate: 0.10,
            compounding: 1,
            annual_contribution: 100.0,
            annual_limit: None,
        };
        let settings = CompoundConfig {
            plan,
            age: 30,
            retirement_age: 32,
            withdrawal_rate: 0.05,
            points: 5,
            output: PathBuf::from("projection.svg"),
        };
        let report = RecordingReport::new();

        let projection = cli::run_compound_pipeline(&report, &settings).unwrap();

        let expected = plan.project_discrete(2);
        assert_eq!(projection.balance, *expected.last().unwrap());
        assert!((projection.annual_payout - projection.balance * 0.05).abs() < 1e-9);
        assert!((projection.monthly_payout * 12.0 - projection.annual_payout).abs() < 1e-9);
        assert_eq!(report.projection_curve.borrow().len(), 5);
    }
}
