//! Configuration validation.
//!
//! Each analysis validates its own section (plus `[data]` where it loads prices)
//! before any data is read.

use crate::domain::error::FinlabError;
use crate::domain::prices::Frequency;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    validate_data_source(config)?;
    validate_tickers(config)?;
    Ok(())
}

/// Price directory and date window, without the ticker list.
pub fn validate_data_source(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    validate_data_dir(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_frontier_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    let points = optional_int(config, "frontier", "points", 100)?;
    if points < 1 {
        return Err(FinlabError::config_invalid(
            "frontier",
            "points",
            "points must be at least 1",
        ));
    }
    let random = optional_int(config, "frontier", "random_portfolios", 0)?;
    if random < 0 {
        return Err(FinlabError::config_invalid(
            "frontier",
            "random_portfolios",
            "random_portfolios must be non-negative",
        ));
    }
    let rf = optional_double(config, "frontier", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&rf) {
        return Err(FinlabError::config_invalid(
            "frontier",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    validate_frequency(config, "frontier")?;
    Ok(())
}

pub fn validate_bond_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    let principal = require_double(config, "bond", "principal")?;
    if principal <= 0.0 {
        return Err(FinlabError::config_invalid(
            "bond",
            "principal",
            "principal must be positive",
        ));
    }
    let coupon = require_double(config, "bond", "coupon")?;
    if coupon < 0.0 {
        return Err(FinlabError::config_invalid(
            "bond",
            "coupon",
            "coupon must be non-negative",
        ));
    }
    let periods = require_int(config, "bond", "periods")?;
    if periods < 1 || periods > i64::from(i32::MAX) {
        return Err(FinlabError::config_invalid(
            "bond",
            "periods",
            "periods must be a positive integer",
        ));
    }
    let market_price = require_double(config, "bond", "market_price")?;
    if market_price <= 0.0 {
        return Err(FinlabError::config_invalid(
            "bond",
            "market_price",
            "market_price must be positive",
        ));
    }
    let tolerance = optional_double(config, "bond", "tolerance", 1e-10)?;
    if tolerance <= 0.0 {
        return Err(FinlabError::config_invalid(
            "bond",
            "tolerance",
            "tolerance must be positive",
        ));
    }
    let max_iterations = optional_int(config, "bond", "max_iterations", 1000)?;
    if max_iterations < 1 || max_iterations > i64::from(u32::MAX) {
        return Err(FinlabError::config_invalid(
            "bond",
            "max_iterations",
            "max_iterations must be at least 1",
        ));
    }
    for key in ["low_guess", "high_guess"] {
        if optional_double(config, "bond", key, 0.0)? <= -1.0 {
            return Err(FinlabError::config_invalid(
                "bond",
                key,
                "yield guesses must be above -1",
            ));
        }
    }
    Ok(())
}

pub fn validate_compound_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    let principal = require_double(config, "compound", "principal")?;
    if principal < 0.0 {
        return Err(FinlabError::config_invalid(
            "compound",
            "principal",
            "principal must be non-negative",
        ));
    }
    let rate = require_double(config, "compound", "annual_rate")?;
    if rate <= -1.0 {
        return Err(FinlabError::config_invalid(
            "compound",
            "annual_rate",
            "annual_rate must be above -1",
        ));
    }
    if optional_int(config, "compound", "compounding", 1)? < 1 {
        return Err(FinlabError::config_invalid(
            "compound",
            "compounding",
            "compounding must be at least 1",
        ));
    }
    if optional_double(config, "compound", "annual_contribution", 0.0)? < 0.0 {
        return Err(FinlabError::config_invalid(
            "compound",
            "annual_contribution",
            "annual_contribution must be non-negative",
        ));
    }
    if optional_double(config, "compound", "annual_limit", 0.0)? < 0.0 {
        return Err(FinlabError::config_invalid(
            "compound",
            "annual_limit",
            "annual_limit must be a non-negative number",
        ));
    }
    let age = optional_int(config, "compound", "age", 22)?;
    let retirement_age = optional_int(config, "compound", "retirement_age", 65)?;
    if age < 0 {
        return Err(FinlabError::config_invalid(
            "compound",
            "age",
            "age must be non-negative",
        ));
    }
    if retirement_age <= age {
        return Err(FinlabError::config_invalid(
            "compound",
            "retirement_age",
            "retirement_age must be greater than age",
        ));
    }
    let withdrawal = optional_double(config, "compound", "withdrawal_rate", 0.05)?;
    if !(0.0..=1.0).contains(&withdrawal) {
        return Err(FinlabError::config_invalid(
            "compound",
            "withdrawal_rate",
            "withdrawal_rate must be between 0 and 1",
        ));
    }
    optional_int(config, "compound", "points", 2)?;
    Ok(())
}

pub fn validate_cluster_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    if optional_int(config, "cluster", "k", 1)? < 1 {
        return Err(FinlabError::config_invalid(
            "cluster",
            "k",
            "k must be at least 1",
        ));
    }
    validate_frequency(config, "cluster")?;
    Ok(())
}

pub fn validate_compare_config(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    for key in ["security", "index"] {
        match config.get_string("compare", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(FinlabError::ConfigMissing {
                    section: "compare".to_string(),
                    key: key.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    match config.get_string("data", "data_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(FinlabError::ConfigMissing {
            section: "data".to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    let tickers = config.get_string("data", "tickers");
    let tickers_file = config.get_string("data", "tickers_file");

    match (tickers, tickers_file) {
        (Some(t), _) if !t.trim().is_empty() => Ok(()),
        (_, Some(f)) if !f.trim().is_empty() => Ok(()),
        _ => Err(FinlabError::ConfigMissing {
            section: "data".to_string(),
            key: "tickers".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), FinlabError> {
    let start_str = config.get_string("data", "start_date");
    let end_str = config.get_string("data", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(FinlabError::config_invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub(crate) fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, FinlabError> {
    match value {
        None => Err(FinlabError::ConfigMissing {
            section: "data".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            FinlabError::config_invalid(
                "data",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_frequency(config: &dyn ConfigPort, section: &str) -> Result<(), FinlabError> {
    if let Some(value) = config.get_string(section, "frequency") {
        value
            .parse::<Frequency>()
            .map_err(|e| FinlabError::config_invalid(section, "frequency", e.to_string()))?;
    }
    Ok(())
}

/// `default` when the key is unset, an error when it is set but not a number.
fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, FinlabError> {
    match config.get_string(section, key) {
        Some(_) => require_double(config, section, key),
        None => Ok(default),
    }
}

fn optional_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, FinlabError> {
    match config.get_string(section, key) {
        Some(_) => require_int(config, section, key),
        None => Ok(default),
    }
}

fn require_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<i64, FinlabError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| FinlabError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    raw.trim().parse::<i64>().map_err(|_| {
        FinlabError::config_invalid(section, key, format!("'{raw}' is not an integer"))
    })
}

fn require_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, FinlabError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| FinlabError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FinlabError::config_invalid(section, key, format!("'{raw}' is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_data_config_passes() {
        let config = make_config(
            r#"
[data]
data_dir = ./prices
tickers = AAPL MSFT SPY
start_date = 2018-01-01
end_date = 2025-05-07
"#,
        );
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn data_source_does_not_need_tickers() {
        let config = make_config("[data]\ndata_dir = d\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        assert!(validate_data_source(&config).is_ok());
    }

    #[test]
    fn tickers_file_accepted() {
        let config = make_config("[data]\ndata_dir = d\ntickers_file = t.txt\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn missing_tickers_fails() {
        let config = make_config("[data]\ndata_dir = d\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigMissing { key, .. } if key == "tickers"));
    }

    #[test]
    fn missing_data_dir_fails() {
        let config = make_config("[data]\ntickers = A\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigMissing { key, .. } if key == "data_dir"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[data]\ndata_dir = d\ntickers = A\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[data]\ndata_dir = d\ntickers = A\nstart_date = 2020/01/01\nend_date = 2021-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn frontier_points_zero_fails() {
        let config = make_config("[frontier]\npoints = 0\n");
        let err = validate_frontier_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "points"));
    }

    #[test]
    fn frontier_defaults_pass() {
        assert!(validate_frontier_config(&make_config("[frontier]\n")).is_ok());
    }

    #[test]
    fn frontier_unknown_frequency_fails() {
        let config = make_config("[frontier]\nfrequency = weekly\n");
        let err = validate_frontier_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "frequency"));
    }

    #[test]
    fn frontier_risk_free_rate_out_of_range_fails() {
        let config = make_config("[frontier]\nrisk_free_rate = 1.5\n");
        let err = validate_frontier_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn valid_bond_config_passes() {
        let config = make_config(
            "[bond]\nprincipal = 100\ncoupon = 6\nperiods = 2\nmarket_price = 96\nlow_guess = 0.01\nhigh_guess = 0.2\n",
        );
        assert!(validate_bond_config(&config).is_ok());
    }

    #[test]
    fn bond_missing_market_price_fails() {
        let config = make_config("[bond]\nprincipal = 100\ncoupon = 6\nperiods = 2\n");
        let err = validate_bond_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigMissing { key, .. } if key == "market_price"));
    }

    #[test]
    fn bond_non_numeric_principal_fails() {
        let config = make_config("[bond]\nprincipal = lots\ncoupon = 6\nperiods = 2\nmarket_price = 96\n");
        let err = validate_bond_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "principal"));
    }

    #[test]
    fn bond_zero_periods_fails() {
        let config = make_config("[bond]\nprincipal = 100\ncoupon = 6\nperiods = 0\nmarket_price = 96\n");
        let err = validate_bond_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "periods"));
    }

    #[test]
    fn valid_compound_config_passes() {
        let config = make_config(
            r#"
[compound]
principal = 5000
annual_rate = 0.12
annual_contribution = 6960
annual_limit = 7000
age = 22
retirement_age = 65
withdrawal_rate = 0.05
"#,
        );
        assert!(validate_compound_config(&config).is_ok());
    }

    #[test]
    fn compound_retirement_before_age_fails() {
        let config = make_config("[compound]\nprincipal = 1\nannual_rate = 0.1\nage = 65\nretirement_age = 60\n");
        let err = validate_compound_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "retirement_age"));
    }

    #[test]
    fn compound_bad_limit_fails() {
        let config = make_config("[compound]\nprincipal = 1\nannual_rate = 0.1\nannual_limit = none\nage = 20\nretirement_age = 60\n");
        let err = validate_compound_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "annual_limit"));
    }

    #[test]
    fn frontier_non_numeric_settings_fail() {
        for (key, value) in [
            ("points", "abc"),
            ("random_portfolios", "2.5"),
            ("risk_free_rate", "low"),
        ] {
            let config = make_config(&format!("[frontier]\n{key} = {value}\n"));
            let err = validate_frontier_config(&config).unwrap_err();
            assert!(
                matches!(err, FinlabError::ConfigInvalid { key: ref k, .. } if k == key),
                "{key} = {value} gave {err:?}"
            );
        }
    }

    #[test]
    fn bond_non_numeric_solver_settings_fail() {
        let base = "[bond]\nprincipal = 100\ncoupon = 6\nperiods = 2\nmarket_price = 96\n";
        for (key, value) in [
            ("tolerance", "x"),
            ("max_iterations", "many"),
            ("low_guess", "?"),
            ("high_guess", "0.2%"),
        ] {
            let config = make_config(&format!("{base}{key} = {value}\n"));
            let err = validate_bond_config(&config).unwrap_err();
            assert!(
                matches!(err, FinlabError::ConfigInvalid { key: ref k, .. } if k == key),
                "{key} = {value} gave {err:?}"
            );
        }
    }

    #[test]
    fn bond_non_integer_periods_fail() {
        let config = make_config("[bond]\nprincipal = 100\ncoupon = 6\nperiods = two\nmarket_price = 96\n");
        let err = validate_bond_config(&config).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "periods"));
    }

    #[test]
    fn compound_non_numeric_settings_fail() {
        let base = "[compound]\nprincipal = 1\nannual_rate = 0.1\n";
        for (key, value) in [
            ("compounding", "monthly"),
            ("annual_contribution", "lots"),
            ("age", "young"),
            ("retirement_age", "later"),
            ("withdrawal_rate", "4%"),
            ("points", "ten"),
        ] {
            let config = make_config(&format!("{base}{key} = {value}\n"));
            let err = validate_compound_config(&config).unwrap_err();
            assert!(
                matches!(err, FinlabError::ConfigInvalid { key: ref k, .. } if k == key),
                "{key} = {value} gave {err:?}"
            );
        }
    }

    #[test]
    fn compound_unset_ages_use_defaults() {
        let config = make_config("[compound]\nprincipal = 1\nannual_rate = 0.1\n");
        assert!(validate_compound_config(&config).is_ok());
    }

    #[test]
    fn cluster_non_integer_k_fails() {
        let err = validate_cluster_config(&make_config("[cluster]\nk = three\n")).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "k"));
    }

    #[test]
    fn cluster_k_zero_fails() {
        let err = validate_cluster_config(&make_config("[cluster]\nk = 0\n")).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigInvalid { key, .. } if key == "k"));
        assert!(validate_cluster_config(&make_config("[cluster]\n")).is_ok());
    }

    #[test]
    fn compare_requires_both_tickers() {
        let err = validate_compare_config(&make_config("[compare]\nsecurity = QQQ\n")).unwrap_err();
        assert!(matches!(err, FinlabError::ConfigMissing { key, .. } if key == "index"));
        assert!(validate_compare_config(&make_config("[compare]\nsecurity = QQQ\nindex = ^NDX\n")).is_ok());
    }
}
