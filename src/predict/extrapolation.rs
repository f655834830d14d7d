
use crate::errors::{ForecastError, Result};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};

/// 外挿による次期予測
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrapolation {
    pub period: i32,
    pub value: f64,
    /// 始点と終点から求めた 1 年あたりの変化量
    pub slope: f64,
}

/// 始点と終点の 2 点を結ぶ直線で次の年を予測する。
///
/// 最小二乗ではないので、系列の端にある外れ値がそのまま傾きに効く。
/// 系列は年の昇順に並べ替えてから使う。
pub fn extrapolate(series: &TimeSeries) -> Result<Extrapolation> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            required: 2,
            actual: series.len(),
        });
    }

    let sorted = series.sorted();
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Err(ForecastError::EmptySeries);
    };

    if last.year == first.year {
        return Err(ForecastError::DegenerateSeries { year: last.year });
    }

    let period = next_year(last.year)?;
    let span = i64::from(last.year) - i64::from(first.year);
    let slope = (last.value - first.value) / span as f64;
    Ok(Extrapolation {
        period,
        value: last.value + slope,
        slope,
    })
}

/// 翌年。`i32` の範囲を超える場合は `YearOutOfRange`。
pub fn next_year(year: i32) -> Result<i32> {
    year.checked_add(1).ok_or(ForecastError::YearOutOfRange { year })
}

/// テキスト入力から直接外挿する
pub fn extrapolate_text(text: &str) -> Result<Extrapolation> {
    extrapolate(&TimeSeries::parse(text)?)
}
