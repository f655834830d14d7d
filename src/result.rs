use crate::metrics::Accuracy;
use crate::predict::Algorithm;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 予測対象の期間。ローカル予測では年、リモートでは設定されたラベル。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    Year(i32),
    Label(String),
}

impl Period {
    /// 数値として読めるラベルは年として扱う
    pub fn from_label(label: &str) -> Self {
        match label.trim().parse::<i32>() {
            Ok(year) => Self::Year(year),
            Err(_) => Self::Label(label.to_string()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{}", year),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// リモートサービスが生成したグラフ画像（PNG）。中身は解釈しない。
#[derive(Clone, PartialEq, Eq)]
pub struct Plot {
    png: Vec<u8>,
}

impl Plot {
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let png = STANDARD.decode(encoded.trim())?;
        Ok(Self { png })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.png)
    }
}

impl fmt::Debug for Plot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plot({} bytes)", self.png.len())
    }
}

/// 重回帰による予測結果
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionForecast {
    pub region: String,
    pub period: Period,
    pub value: f64,
    /// リモートの `growth_penduduk` に対応する成長率（%）
    pub primary_growth: Option<f64>,
    /// リモートの `growth_pendapatan` に対応する成長率（%）
    pub secondary_growth: Option<f64>,
    /// 予測に使った共変量の見積もり（人口, 所得）
    pub covariates: Option<(f64, f64)>,
    pub accuracy: Option<Accuracy>,
    pub plot: Option<Plot>,
}

/// 線形外挿による予測結果。精度指標は持たない。
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrapolationForecast {
    pub region: String,
    pub period: Period,
    pub value: f64,
    pub growth: Option<f64>,
    pub plot: Option<Plot>,
}

/// アルゴリズムごとの予測結果
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Regression(RegressionForecast),
    Extrapolation(ExtrapolationForecast),
}

impl PredictionResult {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Regression(_) => Algorithm::Regression,
            Self::Extrapolation(_) => Algorithm::Extrapolation,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            Self::Regression(r) => &r.region,
            Self::Extrapolation(e) => &e.region,
        }
    }

    pub fn period(&self) -> &Period {
        match self {
            Self::Regression(r) => &r.period,
            Self::Extrapolation(e) => &e.period,
        }
    }

    pub fn predicted_value(&self) -> f64 {
        match self {
            Self::Regression(r) => r.value,
            Self::Extrapolation(e) => e.value,
        }
    }

    pub fn plot(&self) -> Option<&Plot> {
        match self {
            Self::Regression(r) => r.plot.as_ref(),
            Self::Extrapolation(e) => e.plot.as_ref(),
        }
    }
}
