//! Efficient frontier by minimum-variance quadratic programming.
//!
//! For each target return `t` on an even sweep between the smallest and the
//! largest expected asset return, solves
//!
//! ```text
//! minimize   wᵀ Σ w
//! subject to wᵀ μ = t,  Σ w = 1,  (w ≥ 0 when long-only)
//! ```
//!
//! The unconstrained-sign problem is one KKT linear system per target, all sharing
//! the same matrix. The long-only problem uses a primal active-set method started
//! from a feasible two-asset mix. Points come back sorted by volatility ascending.

use crate::domain::error::FinlabError;
use crate::domain::portfolio::{check_dimensions, sharpe_ratio, Portfolio};
use crate::domain::returns::ReturnSeries;
use nalgebra::{DMatrix, DVector, SVD};
use tracing::{debug, warn};

pub const DEFAULT_FRONTIER_POINTS: usize = 100;

/// Relative singular-value cutoff for rank decisions on KKT matrices.
const RANK_TOLERANCE: f64 = 1e-12;
/// Largest active-set step treated as zero, relative to the largest weight.
const STEP_TOLERANCE: f64 = 1e-10;
/// Most negative bound multiplier still accepted as optimal, relative to the gradient.
const MULTIPLIER_TOLERANCE: f64 = 1e-8;
/// Expected returns closer than this are treated as equal.
const RETURN_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontierOptions {
    pub points: usize,
    pub long_only: bool,
    pub check_labels: bool,
}

impl Default for FrontierOptions {
    fn default() -> Self {
        Self {
            points: DEFAULT_FRONTIER_POINTS,
            long_only: false,
            check_labels: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontierPoint {
    pub target_return: f64,
    pub portfolio: Portfolio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EfficientFrontier {
    /// Global minimum-volatility portfolio, solved without a return target.
    pub min_volatility: Portfolio,
    /// Solved points, volatility ascending.
    pub points: Vec<FrontierPoint>,
    /// Targets with no long-only solution.
    pub skipped: Vec<f64>,
}

impl EfficientFrontier {
    pub fn returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.portfolio.expected_return).collect()
    }

    pub fn volatilities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.portfolio.volatility).collect()
    }

    pub fn weights(&self) -> Vec<&[f64]> {
        self.points
            .iter()
            .map(|p| p.portfolio.weights.as_slice())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min_risk(&self) -> Option<&FrontierPoint> {
        self.points.first()
    }

    pub fn max_return(&self) -> Option<&FrontierPoint> {
        self.points.iter().max_by(|a, b| {
            a.portfolio
                .expected_return
                .total_cmp(&b.portfolio.expected_return)
        })
    }

    /// Point with the best (return - rf) / volatility; riskless points are ignored.
    pub fn max_sharpe(&self, risk_free_rate: f64) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .filter(|p| p.portfolio.volatility > 0.0)
            .max_by(|a, b| {
                let sa = a.portfolio.sharpe_ratio(risk_free_rate);
                let sb = b.portfolio.sharpe_ratio(risk_free_rate);
                sa.total_cmp(&sb)
            })
    }

    pub fn sharpe_ratios(&self, risk_free_rate: f64) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| {
                sharpe_ratio(
                    p.portfolio.expected_return,
                    p.portfolio.volatility,
                    risk_free_rate,
                )
            })
            .collect()
    }
}

/// `points` evenly spaced values from min μ to max μ, inclusive.
pub fn target_sweep(expected_returns: &DVector<f64>, points: usize) -> Vec<f64> {
    if expected_returns.is_empty() || points == 0 {
        return Vec::new();
    }
    let lo = expected_returns.min();
    let hi = expected_returns.max();
    if points == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (points - 1) as f64;
    (0..points)
        .map(|i| if i == points - 1 { hi } else { lo + step * i as f64 })
        .collect()
}

/// Computes the frontier from a return series (mean and sample covariance).
pub fn efficient_frontier(
    returns: &ReturnSeries,
    options: &FrontierOptions,
) -> Result<EfficientFrontier, FinlabError> {
    if options.check_labels {
        returns.check_labels()?;
    }
    if returns.n_assets() < 2 {
        return Err(FinlabError::InsufficientData {
            what: "assets".into(),
            required: 2,
            actual: returns.n_assets(),
        });
    }
    let mu = returns.expected_returns()?;
    let cov = returns.covariance()?;
    efficient_frontier_from_moments(&mu, &cov, options)
}

/// Computes the frontier from an expected-return vector and covariance matrix.
pub fn efficient_frontier_from_moments(
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    options: &FrontierOptions,
) -> Result<EfficientFrontier, FinlabError> {
    check_dimensions(expected_returns, covariance)?;
    let n = expected_returns.len();
    if n < 2 {
        return Err(FinlabError::InsufficientData {
            what: "assets".into(),
            required: 2,
            actual: n,
        });
    }
    if options.points == 0 {
        return Err(FinlabError::invalid_input(
            "frontier needs at least one target point",
        ));
    }

    let lo = expected_returns.min();
    let hi = expected_returns.max();
    let flat_returns = hi - lo <= RETURN_TOLERANCE * hi.abs().max(1.0);
    if flat_returns {
        debug!("all expected returns equal; dropping the return constraint");
    }

    let targets = target_sweep(expected_returns, options.points);
    let mut points = Vec::with_capacity(targets.len());
    let mut skipped = Vec::new();

    let min_volatility = if options.long_only {
        let start = DVector::from_element(n, 1.0 / n as f64);
        let budget = Constraints::budget(n);
        let w = solve_long_only(covariance, &budget, start, &vec![true; n], lo)?;
        Portfolio::evaluate_unchecked(&w, expected_returns, covariance)
    } else {
        let gmv = KktSystem::new(covariance, Constraints::budget(n).a)?;
        let w = gmv.solve(&DVector::from_element(1, 1.0))?;
        Portfolio::evaluate_unchecked(&w, expected_returns, covariance)
    };

    if options.long_only {
        for &target in &targets {
            match solve_long_only_target(expected_returns, covariance, target, flat_returns) {
                Ok(w) => points.push(FrontierPoint {
                    target_return: target,
                    portfolio: Portfolio::evaluate_unchecked(&w, expected_returns, covariance),
                }),
                Err(FinlabError::InfeasibleOrUnbounded { target, reason }) => {
                    warn!("skipping frontier target {target:.6}: {reason}");
                    skipped.push(target);
                }
                Err(e) => return Err(e),
            }
        }
    } else {
        let constraints = if flat_returns {
            Constraints::budget(n)
        } else {
            Constraints::budget_and_return(expected_returns, 0.0)
        };
        let kkt = KktSystem::new(covariance, constraints.a)?;
        for &target in &targets {
            let rhs = if flat_returns {
                DVector::from_element(1, 1.0)
            } else {
                DVector::from_vec(vec![1.0, target])
            };
            let w = kkt.solve(&rhs)?;
            points.push(FrontierPoint {
                target_return: target,
                portfolio: Portfolio::evaluate_unchecked(&w, expected_returns, covariance),
            });
        }
    }

    points.sort_by(|a, b| {
        a.portfolio
            .volatility
            .total_cmp(&b.portfolio.volatility)
            .then(a.portfolio.expected_return.total_cmp(&b.portfolio.expected_return))
    });

    debug!(
        solved = points.len(),
        skipped = skipped.len(),
        "efficient frontier computed"
    );

    Ok(EfficientFrontier {
        min_volatility,
        points,
        skipped,
    })
}

/// Linear equality constraints `A w = b`.
struct Constraints {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl Constraints {
    fn budget(n: usize) -> Self {
        Self {
            a: DMatrix::from_element(1, n, 1.0),
            b: DVector::from_element(1, 1.0),
        }
    }

    fn budget_and_return(expected_returns: &DVector<f64>, target: f64) -> Self {
        let n = expected_returns.len();
        let a = DMatrix::from_fn(2, n, |i, j| if i == 0 { 1.0 } else { expected_returns[j] });
        Self {
            a,
            b: DVector::from_vec(vec![1.0, target]),
        }
    }
}

/// Factored KKT matrix `[[2Σ, Aᵀ], [A, 0]]` for the equality-constrained problem.
struct KktSystem {
    n: usize,
    svd: SVD<f64, nalgebra::Dyn, nalgebra::Dyn>,
    eps: f64,
}

impl KktSystem {
    fn new(covariance: &DMatrix<f64>, a: DMatrix<f64>) -> Result<Self, FinlabError> {
        let n = covariance.nrows();
        let kkt = kkt_matrix(covariance, &a);
        let size = kkt.nrows();
        let svd = kkt.svd(true, true);
        let eps = svd.singular_values.max() * RANK_TOLERANCE;
        if svd.rank(eps) < size {
            return Err(FinlabError::SingularCovariance);
        }
        Ok(Self { n, svd, eps })
    }

    /// Weights for constraint right-hand side `b`.
    fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, FinlabError> {
        let mut rhs = DVector::zeros(self.n + b.len());
        rhs.rows_mut(self.n, b.len()).copy_from(b);
        let x = self
            .svd
            .solve(&rhs, self.eps)
            .map_err(|_| FinlabError::SingularCovariance)?;
        Ok(x.rows(0, self.n).into_owned())
    }
}

fn kkt_matrix(covariance: &DMatrix<f64>, a: &DMatrix<f64>) -> DMatrix<f64> {
    let n = covariance.nrows();
    let m = a.nrows();
    let mut kkt = DMatrix::zeros(n + m, n + m);
    kkt.view_mut((0, 0), (n, n)).copy_from(&(covariance * 2.0));
    kkt.view_mut((0, n), (n, m)).copy_from(&a.transpose());
    kkt.view_mut((n, 0), (m, n)).copy_from(a);
    kkt
}

fn solve_long_only_target(
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    target: f64,
    flat_returns: bool,
) -> Result<DVector<f64>, FinlabError> {
    let n = expected_returns.len();
    let lo = expected_returns.min();
    let hi = expected_returns.max();
    let tol = RETURN_TOLERANCE * hi.abs().max(1.0);

    if target < lo - tol || target > hi + tol {
        return Err(FinlabError::InfeasibleOrUnbounded {
            target,
            reason: "target outside the range of asset returns".into(),
        });
    }

    // At a sweep endpoint (or with flat returns) only the assets sitting at that
    // return may hold weight, and the return constraint collapses into the budget.
    let extreme = if flat_returns {
        Some(lo)
    } else if target <= lo + tol {
        Some(lo)
    } else if target >= hi - tol {
        Some(hi)
    } else {
        None
    };

    if let Some(level) = extreme {
        let allowed: Vec<bool> = expected_returns
            .iter()
            .map(|&m| (m - level).abs() <= tol)
            .collect();
        let count = allowed.iter().filter(|&&a| a).count();
        let start = DVector::from_fn(n, |i, _| if allowed[i] { 1.0 / count as f64 } else { 0.0 });
        return solve_long_only(covariance, &Constraints::budget(n), start, &allowed, target);
    }

    let lo_i = expected_returns.imin();
    let hi_i = expected_returns.imax();
    let theta = ((target - lo) / (hi - lo)).clamp(0.0, 1.0);
    let mut start = DVector::zeros(n);
    start[hi_i] = theta;
    start[lo_i] = 1.0 - theta;

    let constraints = Constraints::budget_and_return(expected_returns, target);
    solve_long_only(covariance, &constraints, start, &vec![true; n], target)
}

/// Primal active-set method for `min wᵀΣw, A w = b, w ≥ 0` from a feasible `start`.
///
/// Assets with `allowed[i] == false` stay pinned at zero. Bounds are released by
/// Bland's rule (lowest index first). A bound that is released and then blocks
/// again without any movement is not offered again until the weights move.
fn solve_long_only(
    covariance: &DMatrix<f64>,
    constraints: &Constraints,
    start: DVector<f64>,
    allowed: &[bool],
    target: f64,
) -> Result<DVector<f64>, FinlabError> {
    let n = covariance.nrows();
    let a = &constraints.a;
    let mut w = start;
    let mut at_bound: Vec<bool> = (0..n).map(|i| !allowed[i] || w[i] <= 0.0).collect();
    for i in 0..n {
        if at_bound[i] {
            w[i] = 0.0;
        }
    }

    // every bound can enter and leave the working set a bounded number of
    // times between two moves; this cap is far above that
    let max_iterations = 4 * n * n + 100;
    let mut stalled = vec![false; n];
    let mut at_subspace_minimum = false;
    let mut last_released = None;

    for _ in 0..max_iterations {
        let free: Vec<usize> = (0..n).filter(|&i| !at_bound[i]).collect();
        let gradient = covariance * &w * 2.0;
        let (step, nu) = equality_step(covariance, a, &free, &gradient, target)?;
        let step_floor = STEP_TOLERANCE * w.amax().max(1.0);

        if at_subspace_minimum || step.amax() <= step_floor {
            let multipliers = a.transpose() * &nu + &gradient;
            let floor = MULTIPLIER_TOLERANCE * gradient.amax().max(f64::MIN_POSITIVE);
            let release = (0..n)
                .find(|&i| at_bound[i] && allowed[i] && !stalled[i] && multipliers[i] < -floor);
            match release {
                Some(i) => {
                    at_bound[i] = false;
                    last_released = Some(i);
                    at_subspace_minimum = false;
                }
                None => return Ok(w),
            }
            continue;
        }

        let mut alpha: f64 = 1.0;
        let mut blocking = None;
        for (k, &i) in free.iter().enumerate() {
            if step[k] < -step_floor {
                let ratio = w[i].max(0.0) / -step[k];
                if ratio < alpha {
                    alpha = ratio;
                    blocking = Some(i);
                }
            }
        }
        for (k, &i) in free.iter().enumerate() {
            w[i] = (w[i] + alpha * step[k]).max(0.0);
        }

        match blocking {
            Some(i) => {
                w[i] = 0.0;
                at_bound[i] = true;
                at_subspace_minimum = false;
                if alpha > 0.0 {
                    stalled.iter_mut().for_each(|s| *s = false);
                } else if last_released == Some(i) {
                    stalled[i] = true;
                }
            }
            None => {
                at_subspace_minimum = true;
                stalled.iter_mut().for_each(|s| *s = false);
            }
        }
        last_released = None;
    }

    Err(FinlabError::InfeasibleOrUnbounded {
        target,
        reason: format!("active-set search did not settle within {max_iterations} iterations"),
    })
}

/// Solves the equality-constrained step over the free assets.
///
/// Returns the step on the free assets and the constraint multipliers.
fn equality_step(
    covariance: &DMatrix<f64>,
    a: &DMatrix<f64>,
    free: &[usize],
    gradient: &DVector<f64>,
    target: f64,
) -> Result<(DVector<f64>, DVector<f64>), FinlabError> {
    let f = free.len();
    let m = a.nrows();
    let cov_ff = DMatrix::from_fn(f, f, |r, c| covariance[(free[r], free[c])]);
    let a_f = DMatrix::from_fn(m, f, |r, c| a[(r, free[c])]);
    let kkt = kkt_matrix(&cov_ff, &a_f);

    let mut rhs = DVector::zeros(f + m);
    for (k, &i) in free.iter().enumerate() {
        rhs[k] = -gradient[i];
    }

    let svd = kkt.svd(true, true);
    let eps = svd.singular_values.max() * RANK_TOLERANCE;
    let x = svd
        .solve(&rhs, eps)
        .map_err(|reason| FinlabError::InfeasibleOrUnbounded {
            target,
            reason: reason.to_string(),
        })?;
    Ok((x.rows(0, f).into_owned(), x.rows(f, m).into_owned()))
}
