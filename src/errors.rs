use crate::api::ApiError;
use std::time::Duration;
use thiserror::Error;

/// 予測エンジン全体で共有するエラー型
///
/// `OrchestrationState::Failed` に保持されるため `Clone` と `PartialEq` を実装する。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("dimension mismatch: model has {expected} coefficients but got {actual} covariates")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("insufficient data points: need at least {required} but got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("degenerate series: first and last points share year {year}")]
    DegenerateSeries { year: i32 },

    #[error("year out of range: no period follows {year}")]
    YearOutOfRange { year: i32 },

    #[error("malformed row at line {line}: {content:?}")]
    MalformedRow { line: usize, content: String },

    #[error("empty series")]
    EmptySeries,

    #[error("duplicate year in series: {year}")]
    DuplicateYear { year: i32 },

    #[error("division by zero: growth against a zero baseline is not applicable")]
    DivisionByZero,

    #[error("remote error: {0}")]
    Remote(ApiError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ForecastError {
    /// 入力を修正すれば解消するエラーかどうか
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Remote(_) | Self::Timeout(_))
    }
}

impl From<ApiError> for ForecastError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Timeout(duration) => Self::Timeout(duration),
            other => Self::Remote(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
