//! ローカルで実行する予測器
//!
//! どちらも副作用の無い純粋関数で、何度呼んでも同じ結果を返す。

pub mod extrapolation;
pub mod regression;

pub use self::extrapolation::{Extrapolation, extrapolate, extrapolate_text, next_year};
pub use self::regression::{CovariateVector, RegressionModel};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 予測アルゴリズム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// 共変量（人口・所得）による重回帰
    #[value(name = "regression", alias = "linear-regression")]
    Regression,
    /// 系列の始点と終点の傾きによる線形外挿
    Extrapolation,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regression => "linear-regression",
            Self::Extrapolation => "extrapolation",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
