//! CLI definition and dispatch.
//!
//! Every subcommand follows the same stages: load the INI file, validate the
//! sections it needs, build typed settings, run the domain routine through the
//! data and report ports, then print a summary to stdout.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::{load_tickers, parse_tickers, CsvPriceSource};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_report::SvgReportAdapter;
use crate::domain::bond::{solve_yield, Bond, SolverConfig, YieldSolution};
use crate::domain::clustering::{cluster_assets, default_cluster_count, AssetClusters};
use crate::domain::compound::{ContributionPlan, RetirementProjection, DEFAULT_CURVE_POINTS};
use crate::domain::config_validation::{
    parse_date, validate_bond_config, validate_cluster_config, validate_compare_config,
    validate_compound_config, validate_data_config, validate_data_source,
    validate_frontier_config,
};
use crate::domain::error::FinlabError;
use crate::domain::frontier::{efficient_frontier, EfficientFrontier, FrontierOptions};
use crate::domain::index_compare::{compare_to_index, IndexComparison};
use crate::domain::portfolio::random_portfolios;
use crate::domain::prices::{Frequency, PriceTable};
use crate::domain::returns::ReturnSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::{FrontierChart, ProjectionChart, ReportPort};

/// A `tickers` value that selects every ticker the data source has.
pub const ALL_TICKERS: &str = "*";

/// Returns with a larger magnitude than this are reported as suspicious.
pub const OUTLIER_LIMIT: f64 = 1.0;

#[derive(Parser, Debug)]
#[command(name = "finlab", about = "Portfolio and personal-finance analyses")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the mean-variance efficient frontier
    Frontier {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        points: Option<usize>,
        #[arg(long)]
        long_only: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Solve a bond's yield to maturity by bisection
    Yield {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        principal: Option<f64>,
        #[arg(long)]
        coupon: Option<f64>,
        #[arg(long)]
        periods: Option<u32>,
        #[arg(long)]
        market_price: Option<f64>,
        #[arg(long)]
        low: Option<f64>,
        #[arg(long)]
        high: Option<f64>,
    },
    /// Project a savings balance with capped yearly contributions
    Compound {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Cluster assets by return correlation
    Cluster {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Compare a security against an index
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        security: Option<String>,
        #[arg(long)]
        index: Option<String>,
    },
    /// Validate every known section of a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Frontier {
            config,
            output,
            points,
            long_only,
            seed,
        } => run_frontier(&config, output.as_deref(), points, long_only, seed),
        Command::Yield {
            config,
            principal,
            coupon,
            periods,
            market_price,
            low,
            high,
        } => {
            let overrides = BondOverrides {
                principal,
                coupon,
                periods,
                market_price,
                low,
                high,
            };
            run_yield(config.as_deref(), &overrides)
        }
        Command::Compound { config, output } => run_compound(&config, output.as_deref()),
        Command::Cluster { config, output, k } => run_cluster(&config, output.as_deref(), k),
        Command::Compare {
            config,
            output,
            security,
            index,
        } => run_compare(
            &config,
            output.as_deref(),
            security.as_deref(),
            index.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FinlabError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| FinlabError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Reads `[data]`. Tickers come from `tickers`, or from `tickers_file` when that is unset.
pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, FinlabError> {
    let data_dir = config
        .get_string("data", "data_dir")
        .map(|d| PathBuf::from(d.trim()))
        .ok_or_else(|| FinlabError::ConfigMissing {
            section: "data".into(),
            key: "data_dir".into(),
        })?;
    let start_date = parse_date(config.get_string("data", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("data", "end_date").as_deref(), "end_date")?;

    let tickers = match config
        .get_string("data", "tickers")
        .filter(|t| !t.trim().is_empty())
    {
        Some(list) => parse_tickers(&list),
        None => match config.get_string("data", "tickers_file") {
            Some(file) => load_tickers(Path::new(file.trim()))?,
            None => Vec::new(),
        },
    };

    Ok(DataConfig {
        data_dir,
        tickers,
        start_date,
        end_date,
    })
}

fn frequency_setting(
    config: &dyn ConfigPort,
    section: &str,
    default: Frequency,
) -> Result<Frequency, FinlabError> {
    match config.get_string(section, "frequency") {
        Some(value) => value
            .parse::<Frequency>()
            .map_err(|e| FinlabError::config_invalid(section, "frequency", e.to_string())),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontierConfig {
    pub options: FrontierOptions,
    pub frequency: Frequency,
    /// Annual rate; divided by periods per year before use.
    pub risk_free_rate: f64,
    pub random_portfolios: usize,
    pub seed: Option<u64>,
    pub output: PathBuf,
}

impl FrontierConfig {
    pub fn periodic_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.frequency.periods_per_year()
    }
}

pub fn build_frontier_config(config: &dyn ConfigPort) -> Result<FrontierConfig, FinlabError> {
    let seed = match config.get_string("frontier", "seed") {
        Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
            FinlabError::config_invalid("frontier", "seed", "seed must be a non-negative integer")
        })?),
        None => None,
    };
    Ok(FrontierConfig {
        options: FrontierOptions {
            points: config.get_int("frontier", "points", 100).max(1) as usize,
            long_only: config.get_bool("frontier", "long_only", false),
            check_labels: config.get_bool("frontier", "check_labels", true),
        },
        frequency: frequency_setting(config, "frontier", Frequency::Quarterly)?,
        risk_free_rate: config.get_double("frontier", "risk_free_rate", 0.0433),
        random_portfolios: config.get_int("frontier", "random_portfolios", 0).max(0) as usize,
        seed,
        output: output_setting(config, "frontier", "frontier.svg"),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondConfig {
    pub bond: Bond,
    pub low_guess: f64,
    pub high_guess: f64,
    pub solver: SolverConfig,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            bond: Bond {
                principal: 100.0,
                coupon: 6.0,
                periods: 2,
                market_price: 96.0,
            },
            low_guess: 0.01,
            high_guess: 0.2,
            solver: SolverConfig::default(),
        }
    }
}

/// Command-line values that take precedence over `[bond]`.
#[derive(Debug, Clone, Default)]
pub struct BondOverrides {
    pub principal: Option<f64>,
    pub coupon: Option<f64>,
    pub periods: Option<u32>,
    pub market_price: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl BondOverrides {
    pub fn apply(&self, mut config: BondConfig) -> BondConfig {
        if let Some(v) = self.principal {
            config.bond.principal = v;
        }
        if let Some(v) = self.coupon {
            config.bond.coupon = v;
        }
        if let Some(v) = self.periods {
            config.bond.periods = v;
        }
        if let Some(v) = self.market_price {
            config.bond.market_price = v;
        }
        if let Some(v) = self.low {
            config.low_guess = v;
        }
        if let Some(v) = self.high {
            config.high_guess = v;
        }
        config
    }
}

pub fn build_bond_config(config: &dyn ConfigPort) -> Result<BondConfig, FinlabError> {
    let defaults = BondConfig::default();
    let periods = config.get_int("bond", "periods", i64::from(defaults.bond.periods));
    let periods = u32::try_from(periods)
        .map_err(|_| FinlabError::config_invalid("bond", "periods", "periods out of range"))?;
    let max_iterations = config.get_int(
        "bond",
        "max_iterations",
        i64::from(defaults.solver.max_iterations),
    );
    let max_iterations = u32::try_from(max_iterations).map_err(|_| {
        FinlabError::config_invalid("bond", "max_iterations", "max_iterations out of range")
    })?;

    Ok(BondConfig {
        bond: Bond {
            principal: config.get_double("bond", "principal", defaults.bond.principal),
            coupon: config.get_double("bond", "coupon", defaults.bond.coupon),
            periods,
            market_price: config.get_double("bond", "market_price", defaults.bond.market_price),
        },
        low_guess: config.get_double("bond", "low_guess", defaults.low_guess),
        high_guess: config.get_double("bond", "high_guess", defaults.high_guess),
        solver: SolverConfig::new(
            config.get_double("bond", "tolerance", defaults.solver.tolerance),
            max_iterations,
        ),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundConfig {
    pub plan: ContributionPlan,
    pub age: u32,
    pub retirement_age: u32,
    pub withdrawal_rate: f64,
    pub points: usize,
    pub output: PathBuf,
}

impl CompoundConfig {
    pub fn years(&self) -> u32 {
        self.retirement_age.saturating_sub(self.age)
    }
}

pub fn build_compound_config(config: &dyn ConfigPort) -> Result<CompoundConfig, FinlabError> {
    let age_setting = |key: &str, default: i64| -> Result<u32, FinlabError> {
        u32::try_from(config.get_int("compound", key, default))
            .map_err(|_| FinlabError::config_invalid("compound", key, "age out of range"))
    };
    let compounding = config.get_int("compound", "compounding", 1);
    let compounding = u32::try_from(compounding).map_err(|_| {
        FinlabError::config_invalid("compound", "compounding", "compounding out of range")
    })?;
    let annual_limit = config
        .get_string("compound", "annual_limit")
        .map(|_| config.get_double("compound", "annual_limit", 0.0));

    let plan = ContributionPlan {
        principal: config.get_double("compound", "principal", 0.0),
        annual_rate: config.get_double("compound", "annual_rate", 0.0),
        compounding,
        annual_contribution: config.get_double("compound", "annual_contribution", 0.0),
        annual_limit,
    };
    plan.validate()?;

    Ok(CompoundConfig {
        plan,
        age: age_setting("age", 22)?,
        retirement_age: age_setting("retirement_age", 65)?,
        withdrawal_rate: config.get_double("compound", "withdrawal_rate", 0.05),
        points: config
            .get_int("compound", "points", DEFAULT_CURVE_POINTS as i64)
            .max(2) as usize,
        output: output_setting(config, "compound", "projection.svg"),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Cluster count; `None` picks `min(assets, 5)`.
    pub k: Option<usize>,
    pub frequency: Frequency,
    pub output: PathBuf,
}

pub fn build_cluster_config(config: &dyn ConfigPort) -> Result<ClusterConfig, FinlabError> {
    let k = match config.get_string("cluster", "k") {
        Some(_) => Some(config.get_int("cluster", "k", 1).max(1) as usize),
        None => None,
    };
    Ok(ClusterConfig {
        k,
        frequency: frequency_setting(config, "cluster", Frequency::Monthly)?,
        output: output_setting(config, "cluster", "correlation.svg"),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub security: String,
    pub index: String,
    pub output: PathBuf,
}

pub fn build_compare_config(config: &dyn ConfigPort) -> Result<CompareConfig, FinlabError> {
    let ticker = |key: &str| {
        config
            .get_string("compare", key)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FinlabError::ConfigMissing {
                section: "compare".into(),
                key: key.into(),
            })
    };
    Ok(CompareConfig {
        security: ticker("security")?,
        index: ticker("index")?,
        output: output_setting(config, "compare", "compare_to_index.svg"),
    })
}

fn output_setting(config: &dyn ConfigPort, section: &str, default: &str) -> PathBuf {
    config
        .get_string(section, "output")
        .filter(|p| !p.trim().is_empty())
        .map(|p| PathBuf::from(p.trim()))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn path_str(path: &Path) -> Result<&str, FinlabError> {
    path.to_str().ok_or_else(|| {
        FinlabError::invalid_input(format!("output path {} is not valid UTF-8", path.display()))
    })
}

/// Fetches every ticker and aligns the histories on one date timeline.
pub fn load_price_table(
    source: &dyn PriceSource,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<PriceTable, FinlabError> {
    if tickers.is_empty() {
        return Err(FinlabError::InsufficientData {
            what: "tickers".into(),
            required: 1,
            actual: 0,
        });
    }
    let listed;
    let tickers = if tickers.len() == 1 && tickers[0] == ALL_TICKERS {
        listed = source.list_tickers()?;
        info!("using all {} tickers in the data source", listed.len());
        listed.as_slice()
    } else {
        tickers
    };
    let mut histories = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let points = source.fetch_closes(ticker, start_date, end_date)?;
        info!("{ticker}: {} closes", points.len());
        histories.push((ticker.clone(), points));
    }
    let table = PriceTable::from_histories(histories);
    for (ticker, missing) in table.missing_counts() {
        if missing > 0 {
            info!("{ticker}: {missing} missing values");
        }
    }
    Ok(table)
}

/// Fill gaps, resample, and convert to simple returns, warning on outliers.
pub fn prepare_returns(table: &PriceTable, frequency: Frequency) -> Result<ReturnSeries, FinlabError> {
    let mut filled = table.clone();
    filled.fill_missing();
    let returns = filled.resample(frequency).pct_change()?;
    let outliers = returns.outliers(OUTLIER_LIMIT);
    if !outliers.is_empty() {
        warn!(
            "{} {frequency} returns exceed {OUTLIER_LIMIT} in magnitude (first: {} at period {}, {:.3})",
            outliers.len(),
            outliers[0].asset,
            outliers[0].period,
            outliers[0].value
        );
    }
    info!(
        "{} {frequency} returns for {} assets",
        returns.n_periods(),
        returns.n_assets()
    );
    Ok(returns)
}

fn format_weights(labels: &[String], weights: &[f64]) -> String {
    labels
        .iter()
        .zip(weights)
        .map(|(label, w)| format!("{label}={w:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn run_frontier_pipeline(
    source: &dyn PriceSource,
    report: &dyn ReportPort,
    data: &DataConfig,
    settings: &FrontierConfig,
) -> Result<EfficientFrontier, FinlabError> {
    let table = load_price_table(source, &data.tickers, data.start_date, data.end_date)?;
    let returns = prepare_returns(&table, settings.frequency)?;
    let labels = returns.labels().to_vec();

    let expected = returns.expected_returns()?;
    println!("Expected average {} returns:", settings.frequency);
    for (label, mu) in labels.iter().zip(expected.iter()) {
        println!("  {label:<10} {mu:.6}");
    }

    let random = if settings.random_portfolios > 0 {
        let covariance = returns.covariance()?;
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let portfolios =
            random_portfolios(&expected, &covariance, settings.random_portfolios, &mut rng)?;
        info!("generated {} random portfolios", portfolios.len());
        portfolios
    } else {
        Vec::new()
    };

    let frontier = efficient_frontier(&returns, &settings.options)?;
    if !frontier.skipped.is_empty() {
        warn!("{} frontier targets had no solution", frontier.skipped.len());
    }

    println!(
        "\nGlobal minimum volatility: return {:.4}, volatility {:.4}",
        frontier.min_volatility.expected_return, frontier.min_volatility.volatility
    );
    println!("  {}", format_weights(&labels, &frontier.min_volatility.weights));

    let weights = frontier.weights();
    if let (Some(first), Some(last)) = (weights.first(), weights.last()) {
        let mid = weights.len() / 2;
        println!("\nFrontier weights (volatility ascending):");
        println!("  start: {}", format_weights(&labels, first));
        println!("  {mid:>5}: {}", format_weights(&labels, weights[mid]));
        println!("  end:   {}", format_weights(&labels, last));
    }

    let rf = settings.periodic_risk_free_rate();
    if let Some(best) = frontier.max_sharpe(rf) {
        println!("\nMax Sharpe ratio portfolio (rf {rf:.5} per period):");
        println!("  Expected return: {:.3}", best.portfolio.expected_return);
        println!("  Volatility:      {:.3}", best.portfolio.volatility);
        println!("  Sharpe ratio:    {:.3}", best.portfolio.sharpe_ratio(rf));
        println!("  Weights: {}", format_weights(&labels, &best.portfolio.weights));
    }

    let output = path_str(&settings.output)?;
    report.write_frontier(
        &FrontierChart {
            frontier: &frontier,
            random: &random,
            risk_free_rate: rf,
        },
        output,
    )?;
    info!("frontier chart written to {output}");

    Ok(frontier)
}

pub fn run_yield_solver(settings: &BondConfig) -> Result<YieldSolution, FinlabError> {
    let solution = solve_yield(
        &settings.bond,
        settings.low_guess,
        settings.high_guess,
        &settings.solver,
    )?;
    println!(
        "Yield to maturity: {:.4}% per period ({} iterations, residual {:.2e})",
        solution.yield_rate * 100.0,
        solution.iterations,
        solution.residual
    );
    Ok(solution)
}

pub fn run_compound_pipeline(
    report: &dyn ReportPort,
    settings: &CompoundConfig,
) -> Result<RetirementProjection, FinlabError> {
    let years = settings.years();
    let balances = settings.plan.project_discrete(years);
    let balance = balances.last().copied().unwrap_or(settings.plan.principal);
    let projection = RetirementProjection::from_balance(balance, settings.withdrawal_rate);

    println!("Annual contributions: ${:.2}/yr", settings.plan.effective_contribution());
    println!("Total years lapsed:   {years} yrs");
    println!("Estimated balance:    ~ ${:.2}", projection.balance);
    println!("Annual payout:        ~ ${:.2}", projection.annual_payout);
    println!("Monthly payout:       ~ ${:.2}", projection.monthly_payout);

    let curve = settings.plan.sample_curve(f64::from(years), settings.points);
    let output = path_str(&settings.output)?;
    report.write_projection(
        &ProjectionChart {
            plan: &settings.plan,
            start_age: f64::from(settings.age),
            years: f64::from(years),
            curve: &curve,
        },
        output,
    )?;
    info!("projection chart written to {output}");

    Ok(projection)
}

pub fn run_cluster_pipeline(
    source: &dyn PriceSource,
    report: &dyn ReportPort,
    data: &DataConfig,
    settings: &ClusterConfig,
) -> Result<AssetClusters, FinlabError> {
    let table = load_price_table(source, &data.tickers, data.start_date, data.end_date)?;
    let returns = prepare_returns(&table, settings.frequency)?;
    let k = settings
        .k
        .unwrap_or_else(|| default_cluster_count(returns.n_assets()));
    let clusters = cluster_assets(&returns, k)?;

    println!("Clusters (k = {k}):");
    for (i, group) in clusters.groups().iter().enumerate() {
        println!("  {}: {}", i + 1, group.join(", "));
    }

    let output = path_str(&settings.output)?;
    report.write_correlation(&clusters, output)?;
    info!("correlation heatmap written to {output}");

    Ok(clusters)
}

pub fn run_compare_pipeline(
    source: &dyn PriceSource,
    report: &dyn ReportPort,
    data: &DataConfig,
    settings: &CompareConfig,
) -> Result<IndexComparison, FinlabError> {
    let tickers = vec![settings.security.clone(), settings.index.clone()];
    let table = load_price_table(source, &tickers, data.start_date, data.end_date)?;
    let comparison = compare_to_index(&table, &settings.security, &settings.index)?;

    println!(
        "{}: {:+.2}%",
        comparison.security,
        comparison.security_return() * 100.0
    );
    println!(
        "{}: {:+.2}%",
        comparison.index,
        comparison.index_return() * 100.0
    );
    println!("Excess return: {:+.2}%", comparison.excess_return() * 100.0);

    let output = path_str(&settings.output)?;
    report.write_comparison(&comparison, output)?;
    info!("comparison chart written to {output}");

    Ok(comparison)
}

fn run_frontier(
    config_path: &Path,
    output: Option<&Path>,
    points: Option<usize>,
    long_only: bool,
    seed: Option<u64>,
) -> Result<(), FinlabError> {
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_frontier_config(&adapter)?;

    let data = build_data_config(&adapter)?;
    let mut settings = build_frontier_config(&adapter)?;
    if let Some(points) = points {
        settings.options.points = points;
    }
    settings.options.long_only |= long_only;
    if seed.is_some() {
        settings.seed = seed;
    }
    if let Some(path) = output {
        settings.output = path.to_path_buf();
    }

    info!(
        "frontier: {} tickers, {} to {}, {} points{}",
        data.tickers.len(),
        data.start_date,
        data.end_date,
        settings.options.points,
        if settings.options.long_only { ", long-only" } else { "" }
    );
    let source = CsvPriceSource::new(data.data_dir.clone());
    run_frontier_pipeline(&source, &SvgReportAdapter::new(), &data, &settings)?;
    Ok(())
}

fn run_yield(config_path: Option<&Path>, overrides: &BondOverrides) -> Result<(), FinlabError> {
    let base = match config_path {
        Some(path) => {
            let adapter = load_config(path)?;
            validate_bond_config(&adapter)?;
            build_bond_config(&adapter)?
        }
        None => BondConfig::default(),
    };
    let settings = overrides.apply(base);
    info!(
        "bond: principal {}, coupon {}, {} periods, market price {}",
        settings.bond.principal,
        settings.bond.coupon,
        settings.bond.periods,
        settings.bond.market_price
    );
    run_yield_solver(&settings)?;
    Ok(())
}

fn run_compound(config_path: &Path, output: Option<&Path>) -> Result<(), FinlabError> {
    let adapter = load_config(config_path)?;
    validate_compound_config(&adapter)?;
    let mut settings = build_compound_config(&adapter)?;
    if let Some(path) = output {
        settings.output = path.to_path_buf();
    }
    run_compound_pipeline(&SvgReportAdapter::new(), &settings)?;
    Ok(())
}

fn run_cluster(
    config_path: &Path,
    output: Option<&Path>,
    k: Option<usize>,
) -> Result<(), FinlabError> {
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_cluster_config(&adapter)?;

    let data = build_data_config(&adapter)?;
    let mut settings = build_cluster_config(&adapter)?;
    if k.is_some() {
        settings.k = k;
    }
    if let Some(path) = output {
        settings.output = path.to_path_buf();
    }
    let source = CsvPriceSource::new(data.data_dir.clone());
    run_cluster_pipeline(&source, &SvgReportAdapter::new(), &data, &settings)?;
    Ok(())
}

/// Tickers given on the command line win over `[compare]`.
fn run_compare(
    config_path: &Path,
    output: Option<&Path>,
    security: Option<&str>,
    index: Option<&str>,
) -> Result<(), FinlabError> {
    let adapter = load_config(config_path)?;
    validate_data_source(&adapter)?;
    let data = build_data_config(&adapter)?;

    let mut settings = match (security, index) {
        (Some(security), Some(index)) => CompareConfig {
            security: security.to_string(),
            index: index.to_string(),
            output: output_setting(&adapter, "compare", "compare_to_index.svg"),
        },
        _ => {
            validate_compare_config(&adapter)?;
            build_compare_config(&adapter)?
        }
    };
    if let Some(security) = security {
        settings.security = security.to_string();
    }
    if let Some(index) = index {
        settings.index = index.to_string();
    }
    if let Some(path) = output {
        settings.output = path.to_path_buf();
    }

    let source = CsvPriceSource::new(data.data_dir.clone());
    run_compare_pipeline(&source, &SvgReportAdapter::new(), &data, &settings)?;
    Ok(())
}

/// Validates each known section present in `config`, returning the names checked.
pub fn validate_sections(config: &dyn ConfigPort) -> Result<Vec<&'static str>, FinlabError> {
    type Validator = fn(&dyn ConfigPort) -> Result<(), FinlabError>;
    let known: [(&'static str, Validator); 6] = [
        ("data", validate_data_source),
        ("frontier", validate_frontier_config),
        ("bond", validate_bond_config),
        ("compound", validate_compound_config),
        ("cluster", validate_cluster_config),
        ("compare", validate_compare_config),
    ];

    let mut checked = Vec::new();
    for (section, validate) in known {
        if config.has_section(section) {
            validate(config)?;
            checked.push(section);
        }
    }
    Ok(checked)
}

fn run_validate(config_path: &Path) -> Result<(), FinlabError> {
    let adapter = load_config(config_path)?;
    let checked = validate_sections(&adapter)?;
    if checked.is_empty() {
        return Err(FinlabError::ConfigParse {
            file: config_path.display().to_string(),
            reason: "no known sections found".into(),
        });
    }
    for section in &checked {
        println!("[{section}] ok");
    }
    println!("Configuration is valid.");
    Ok(())
}
