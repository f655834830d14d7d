pub mod client;

pub use self::client::ForecastApiClient;

use crate::errors::Result;
use crate::predict::Algorithm;
use crate::result::PredictionResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// リモート呼び出しのエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Client error: {0}")]
    Client(String),
    #[error("Timeout error: no response within {0:?}")]
    Timeout(Duration),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// リモート予測サービスのクライアント設定
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// リモートの結果に付ける予測期間のラベル（サービス側が固定で予測する年）
    pub period: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout: Duration::from_secs(30),
            period: "2024".to_string(),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_period(mut self, period: String) -> Self {
        self.period = period;
        self
    }
}

/// 予測リクエスト（地域とアルゴリズムの選択）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub region: String,
    pub algorithm: Algorithm,
}

impl PredictionRequest {
    pub fn new(region: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            region: region.into(),
            algorithm,
        }
    }
}

/// 予測の実行先。HTTP のリモートサービスとローカルのデータセットの 2 実装がある。
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// 選択可能な地域の一覧
    async fn provinces(&self) -> Result<Vec<String>>;

    /// 1 地域分の予測を実行
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;
}

/// `POST /api/*` のリクエストボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceRequest {
    pub provinsi: String,
}

/// `POST /api/linearregression` のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResponse {
    pub data: f64,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub growth_penduduk: Option<f64>,
    #[serde(default)]
    pub growth_pendapatan: Option<f64>,
    #[serde(default)]
    pub accurate: Option<f64>,
    #[serde(default)]
    pub galat: Option<f64>,
    #[serde(default)]
    pub penduduk_2024: Option<f64>,
    #[serde(default)]
    pub pendapatan_2024: Option<f64>,
    #[serde(default)]
    pub provinsi: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/extrapolation` のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrapolationResponse {
    pub data: f64,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub growth_rate: Option<f64>,
    #[serde(default)]
    pub provinsi: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 非 2xx のときにサービスが返すエラーボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
