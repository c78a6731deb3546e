//! Bond pricing and yield-to-maturity by bisection.

use crate::domain::error::FinlabError;

/// A fixed-coupon bond quoted at a market price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub principal: f64,
    /// Coupon paid each period.
    pub coupon: f64,
    pub periods: u32,
    pub market_price: f64,
}

impl Bond {
    pub fn price_at(&self, yield_rate: f64) -> f64 {
        bond_price(self.principal, self.coupon, self.periods, yield_rate)
    }
}

/// Configuration for the bisection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Largest accepted |price - market price|.
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl SolverConfig {
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldSolution {
    pub yield_rate: f64,
    pub iterations: u32,
    /// Model price minus market price at `yield_rate`.
    pub residual: f64,
}

/// Present value of the principal and every coupon, discounted per period at `yield_rate`.
pub fn bond_price(principal: f64, coupon: f64, periods: u32, yield_rate: f64) -> f64 {
    let discount = 1.0 + yield_rate;
    let coupons: f64 = (1..=periods)
        .map(|i| coupon * discount.powi(-(i as i32)))
        .sum();
    principal * discount.powi(-(periods as i32)) + coupons
}

/// Finds the per-period yield at which the bond prices at its market price.
///
/// The guesses may be given in either order but must bracket the market price.
pub fn solve_yield(
    bond: &Bond,
    low_guess: f64,
    high_guess: f64,
    config: &SolverConfig,
) -> Result<YieldSolution, FinlabError> {
    let gap = |y: f64| bond.price_at(y) - bond.market_price;

    let mut lo = low_guess.min(high_guess);
    let mut hi = low_guess.max(high_guess);
    let mut gap_lo = gap(lo);
    let gap_hi = gap(hi);

    if gap_lo * gap_hi > 0.0 {
        return Err(FinlabError::NonBracketingInterval {
            low: lo,
            high: hi,
            price_low: gap_lo + bond.market_price,
            price_high: gap_hi + bond.market_price,
            market_price: bond.market_price,
        });
    }

    if gap_lo.abs() < config.tolerance {
        return Ok(YieldSolution {
            yield_rate: lo,
            iterations: 0,
            residual: gap_lo,
        });
    }
    if gap_hi.abs() < config.tolerance {
        return Ok(YieldSolution {
            yield_rate: hi,
            iterations: 0,
            residual: gap_hi,
        });
    }

    for iteration in 0..config.max_iterations {
        let mid = (lo + hi) / 2.0;
        let gap_mid = gap(mid);

        if gap_mid.abs() < config.tolerance {
            return Ok(YieldSolution {
                yield_rate: mid,
                iterations: iteration + 1,
                residual: gap_mid,
            });
        }

        if gap_mid * gap_lo < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            gap_lo = gap_mid;
        }
    }

    Err(FinlabError::DidNotConverge {
        iterations: config.max_iterations,
        residual: gap((lo + hi) / 2.0).abs(),
    })
}
