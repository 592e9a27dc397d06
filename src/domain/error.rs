//! Domain error types.

/// Why a single instrument's evaluation fell back to holding its current exposure.
///
/// None of these ever leave the evaluator as an `Err`; they are carried in
/// [`DecisionReason::Hold`](crate::domain::evaluator::DecisionReason::Hold).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("insufficient history: have {bars} bars, need {minimum}")]
    InsufficientHistory { bars: usize, minimum: usize },

    #[error("no bar for the instrument in the latest step")]
    MissingLatestBar,

    #[error("failed to compute {indicator}: {reason}")]
    IndicatorComputation { indicator: String, reason: String },

    #[error("non-finite {field}: {value}")]
    InvalidNumericResult { field: &'static str, value: f64 },
}

/// Failure reported by an indicator service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("total volume in window is zero")]
    ZeroVolume,

    #[error("invalid period {0}")]
    InvalidPeriod(usize),
}

/// Top-level error type for pullback.
#[derive(Debug, thiserror::Error)]
pub enum PullbackError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PullbackError> for std::process::ExitCode {
    fn from(err: &PullbackError) -> Self {
        let code: u8 = match err {
            PullbackError::Io(_) => 1,
            PullbackError::ConfigParse { .. }
            | PullbackError::ConfigMissing { .. }
            | PullbackError::ConfigInvalid { .. } => 2,
            PullbackError::Data { .. } => 3,
            PullbackError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
