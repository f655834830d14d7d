
use crate::errors::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 年ごとの観測値
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub year: i32,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(year: i32, value: f64) -> Self {
        Self { year, value }
    }
}

/// (年, 値) の列。挿入順を時系列順として保持する。
///
/// 保存自体は順序を仮定しない。予測器は `sorted()` で年の昇順に並べてから使う。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// 検証せずに点列をそのまま保持する
    pub fn from_points(points: Vec<TimeSeriesPoint>) -> Self {
        Self { points }
    }

    /// 年が重複する点は `DuplicateYear` で拒否する
    pub fn push(&mut self, point: TimeSeriesPoint) -> Result<()> {
        if self.contains_year(point.year) {
            return Err(ForecastError::DuplicateYear { year: point.year });
        }
        self.points.push(point);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesPoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&TimeSeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.points.iter().any(|p| p.year == year)
    }

    pub fn value_at(&self, year: i32) -> Option<f64> {
        self.points.iter().find(|p| p.year == year).map(|p| p.value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn has_unique_years(&self) -> bool {
        let mut years: Vec<i32> = self.points.iter().map(|p| p.year).collect();
        years.sort_unstable();
        years.windows(2).all(|w| w[0] != w[1])
    }

    /// 年の昇順に並べ替えたコピー（同じ年は挿入順を保つ）
    pub fn sorted(&self) -> TimeSeries {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.year);
        Self { points }
    }

    /// `"year,value"` 行の並びをパースする
    ///
    /// 空行は読み飛ばす。それ以外の行は数値 2 トークンちょうどでなければ
    /// `MalformedRow`、行が 1 つも無ければ `EmptySeries`。
    pub fn parse(text: &str) -> Result<Self> {
        let mut series = Self::new();

        for (index, raw) in text.split('\n').enumerate() {
            let row = raw.trim();
            if row.is_empty() {
                continue;
            }
            let malformed = || ForecastError::MalformedRow {
                line: index + 1,
                content: row.to_string(),
            };

            let tokens: Vec<&str> = row.split(',').map(str::trim).collect();
            let [year, value] = tokens.as_slice() else {
                return Err(malformed());
            };
            let year: i32 = year.parse().map_err(|_| malformed())?;
            let value: f64 = value.parse().map_err(|_| malformed())?;
            if !value.is_finite() {
                return Err(malformed());
            }

            series.push(TimeSeriesPoint { year, value })?;
        }

        if series.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        Ok(series)
    }

    /// `parse` で読み戻せるテキスト表現
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{},{}", p.year, p.value)?;
        }
        Ok(())
    }
}

impl FromStr for TimeSeries {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromIterator<TimeSeriesPoint> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = TimeSeriesPoint>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl From<Vec<(i32, f64)>> for TimeSeries {
    fn from(pairs: Vec<(i32, f64)>) -> Self {
        pairs
            .into_iter()
            .map(|(year, value)| TimeSeriesPoint { year, value })
            .collect()
    }
}
