//! Domain error types.

/// Top-level error type for finlab.
#[derive(Debug, thiserror::Error)]
pub enum FinlabError {
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("covariance matrix is singular: cannot solve the minimum-variance system")]
    SingularCovariance,

    #[error("no minimum-variance portfolio for target return {target:.6}: {reason}")]
    InfeasibleOrUnbounded { target: f64, reason: String },

    #[error(
        "interval [{low}, {high}] does not bracket market price {market_price} \
         (prices {price_low:.6} and {price_high:.6})"
    )]
    NonBracketingInterval {
        low: f64,
        high: f64,
        price_low: f64,
        price_high: f64,
        market_price: f64,
    },

    #[error("did not converge after {iterations} iterations (residual {residual:.2e})")]
    DidNotConverge { iterations: u32, residual: f64 },

    #[error("insufficient data: need at least {required} {what}, have {actual}")]
    InsufficientData {
        what: String,
        required: usize,
        actual: usize,
    },

    #[error("invalid asset labels: {reason}")]
    InvalidLabels { reason: String },

    #[error("{count} missing values remain in {ticker}")]
    MissingValues { ticker: String, count: usize },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FinlabError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FinlabError> for std::process::ExitCode {
    fn from(err: &FinlabError) -> Self {
        let code: u8 = match err {
            FinlabError::Io(_) => 1,
            FinlabError::ConfigParse { .. }
            | FinlabError::ConfigMissing { .. }
            | FinlabError::ConfigInvalid { .. } => 2,
            FinlabError::NoData { .. }
            | FinlabError::Data { .. }
            | FinlabError::MissingValues { .. }
            | FinlabError::InsufficientData { .. } => 3,
            FinlabError::DimensionMismatch { .. }
            | FinlabError::InvalidLabels { .. }
            | FinlabError::InvalidInput { .. }
            | FinlabError::NonBracketingInterval { .. } => 4,
            FinlabError::SingularCovariance
            | FinlabError::InfeasibleOrUnbounded { .. }
            | FinlabError::DidNotConverge { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
