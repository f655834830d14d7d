use crate::errors::{ForecastError, Result};

/// 前期から今期への成長率（パーセント）
///
/// 前期が 0 の場合は `DivisionByZero`。N/A として扱うかは呼び出し側が決める。
pub fn rate(previous: f64, current: f64) -> Result<f64> {
    if previous == 0.0 {
        return Err(ForecastError::DivisionByZero);
    }
    Ok((current - previous) / previous * 100.0)
}

/// 成長率を求め、基準が 0 のときは `None`（N/A）とする
pub fn rate_or_na(previous: f64, current: f64) -> Option<f64> {
    match rate(previous, current) {
        Ok(r) => Some(r),
        Err(_) => None,
    }
}

/// 連続する観測値の各期の成長率
pub fn rates(values: &[f64]) -> Result<Vec<f64>> {
    values.windows(2).map(|w| rate(w[0], w[1])).collect()
}

/// 各期の成長率の単純平均（パーセント）
pub fn mean_rate(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(ForecastError::InsufficientData {
            required: 2,
            actual: values.len(),
        });
    }
    let rates = rates(values)?;
    Ok(rates.iter().sum::<f64>() / rates.len() as f64)
}

/// 平均成長率で次期の値を見積もる
pub fn project(last: f64, growth_percent: f64) -> f64 {
    last * (1.0 + growth_percent / 100.0)
}
