//! Compound growth of a savings account with capped yearly contributions.

use crate::domain::error::FinlabError;

/// Default number of samples on a plotted growth curve.
pub const DEFAULT_CURVE_POINTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionPlan {
    pub principal: f64,
    /// Nominal annual rate.
    pub annual_rate: f64,
    /// Compounding periods per year.
    pub compounding: u32,
    pub annual_contribution: f64,
    /// Yearly contribution ceiling, if any.
    pub annual_limit: Option<f64>,
}

impl ContributionPlan {
    pub fn validate(&self) -> Result<(), FinlabError> {
        if !self.principal.is_finite() || self.principal < 0.0 {
            return Err(FinlabError::invalid_input("principal must be non-negative"));
        }
        if !self.annual_rate.is_finite() || self.annual_rate <= -1.0 {
            return Err(FinlabError::invalid_input("annual rate must be above -100%"));
        }
        if self.compounding == 0 {
            return Err(FinlabError::invalid_input(
                "compounding periods per year must be positive",
            ));
        }
        if !self.annual_contribution.is_finite() || self.annual_contribution < 0.0 {
            return Err(FinlabError::invalid_input(
                "annual contribution must be non-negative",
            ));
        }
        if let Some(limit) = self.annual_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(FinlabError::invalid_input(
                    "annual contribution limit must be non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Contribution actually deposited each year.
    pub fn effective_contribution(&self) -> f64 {
        match self.annual_limit {
            Some(limit) => self.annual_contribution.min(limit),
            None => self.annual_contribution,
        }
    }

    /// Effective annual growth, (1 + r/n)^n - 1.
    pub fn annual_growth(&self) -> f64 {
        let n = f64::from(self.compounding.max(1));
        (1.0 + self.annual_rate / n).powf(n) - 1.0
    }

    /// Balance after `years` with end-of-year deposits, continuous in `years`.
    pub fn future_value(&self, years: f64) -> f64 {
        let g = self.annual_growth();
        let c = self.effective_contribution();
        if g.abs() < f64::EPSILON {
            return self.principal + c * years;
        }
        let growth = (1.0 + g).powf(years);
        self.principal * growth + c * (growth - 1.0) / g
    }

    /// Year-end balances for years 0 through `years`.
    pub fn project_discrete(&self, years: u32) -> Vec<f64> {
        let g = self.annual_growth();
        let c = self.effective_contribution();
        let mut balances = Vec::with_capacity(years as usize + 1);
        let mut balance = self.principal;
        balances.push(balance);
        for _ in 0..years {
            balance = balance * (1.0 + g) + c;
            balances.push(balance);
        }
        balances
    }

    /// `points` evenly spaced `(year, balance)` samples over `[0, years]`.
    pub fn sample_curve(&self, years: f64, points: usize) -> Vec<(f64, f64)> {
        match points {
            0 => Vec::new(),
            1 => vec![(0.0, self.principal)],
            _ => {
                let step = years / (points - 1) as f64;
                (0..points)
                    .map(|i| {
                        let t = if i == points - 1 { years } else { step * i as f64 };
                        (t, self.future_value(t))
                    })
                    .collect()
            }
        }
    }
}

/// Payout implied by withdrawing a fixed share of the final balance each year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetirementProjection {
    pub balance: f64,
    pub annual_payout: f64,
    pub monthly_payout: f64,
}

impl RetirementProjection {
    pub fn from_balance(balance: f64, withdrawal_rate: f64) -> Self {
        let annual_payout = balance * withdrawal_rate;
        Self {
            balance,
            annual_payout,
            monthly_payout: annual_payout / 12.0,
        }
    }
}
