use crate::errors::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// 精度（%）と誤差（%）の組
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub accuracy: f64,
    pub error: f64,
}

impl Accuracy {
    /// リモートが返した値をそのまま使う。どちらかが欠けていれば提示しない。
    pub fn from_remote(accuracy: Option<f64>, error: Option<f64>) -> Option<Self> {
        match (accuracy, error) {
            (Some(accuracy), Some(error)) => Some(Self { accuracy, error }),
            _ => None,
        }
    }

    /// 実測値と当てはめ値から MAPE を求める
    ///
    /// `error = mean(|observed - fitted| / |observed|) * 100`、
    /// `accuracy = max(100 - error, 0)`。
    pub fn evaluate(observed: &[f64], fitted: &[f64]) -> Result<Self> {
        if observed.len() != fitted.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: observed.len(),
                actual: fitted.len(),
            });
        }
        if observed.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut total = 0.0;
        for (o, f) in observed.iter().zip(fitted) {
            if *o == 0.0 {
                return Err(ForecastError::DivisionByZero);
            }
            total += ((o - f) / o).abs();
        }

        let error = total / observed.len() as f64 * 100.0;
        Ok(Self {
            accuracy: (100.0 - error).max(0.0),
            error,
        })
    }
}
