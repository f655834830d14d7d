
use crate::errors::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// 共変量ベクトル。長さはモデルの係数の数と一致しなければならない。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CovariateVector(Vec<f64>);

impl CovariateVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for CovariateVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[f64; N]> for CovariateVector {
    fn from(values: [f64; N]) -> Self {
        Self(values.to_vec())
    }
}

/// 事前に求めた切片と係数。プロセスの生存期間中は変更しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl RegressionModel {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn dimension(&self) -> usize {
        self.coefficients.len()
    }

    /// `intercept + Σ coefficients[i] * covariates[i]`
    ///
    /// 丸めは行わない。表示時の丸めは `display` の責務。
    pub fn predict(&self, covariates: &CovariateVector) -> Result<f64> {
        if covariates.len() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: covariates.len(),
            });
        }

        let sum: f64 = self
            .coefficients
            .iter()
            .zip(covariates.as_slice())
            .map(|(c, x)| c * x)
            .sum();
        Ok(self.intercept + sum)
    }
}
