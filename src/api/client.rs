
use super::{
    ApiClientConfig, ApiError, ErrorResponse, ExtrapolationResponse, PredictionRequest,
    PredictionService, ProvinceRequest, RegressionResponse,
};
use crate::errors::Result;
use crate::logging::*;
use crate::metrics::Accuracy;
use crate::predict::Algorithm;
use crate::result::{ExtrapolationForecast, Period, Plot, PredictionResult, RegressionForecast};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const PROVINCES_PATH: &str = "/api/getprovinces";
pub const REGRESSION_PATH: &str = "/api/linearregression";
pub const EXTRAPOLATION_PATH: &str = "/api/extrapolation";

/// 予測サービス（HTTP/JSON）のクライアント
pub struct ForecastApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ForecastApiClient {
    pub fn new(config: ApiClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn new_with_url(base_url: String) -> Self {
        Self::new(ApiClientConfig::new(base_url))
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// 送信してステータスを確認する。タイムアウトは `ApiError::Timeout` に変換する。
    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let response = request
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => body,
        };
        let detail = format!("HTTP Error {}: {}", status, message);
        if status.is_client_error() {
            Err(ApiError::Client(detail))
        } else {
            Err(ApiError::Server(detail))
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout)
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }

    async fn decode<R: DeserializeOwned>(&self, response: Response) -> std::result::Result<R, ApiError> {
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> std::result::Result<R, ApiError> {
        let log = DEFAULT.new(o!(
            "function" => "ForecastApiClient::get_json",
            "path" => path.to_string(),
        ));
        debug!(log, "sending request");
        let response = self.send(self.client.get(self.url(path))).await?;
        self.decode(response).await
    }

    async fn post_json<T, R>(&self, path: &str, body: &T) -> std::result::Result<R, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let log = DEFAULT.new(o!(
            "function" => "ForecastApiClient::post_json",
            "path" => path.to_string(),
        ));
        debug!(log, "sending request");
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        self.decode(response).await
    }

    pub async fn get_provinces(&self) -> std::result::Result<Vec<String>, ApiError> {
        self.get_json(PROVINCES_PATH).await
    }

    pub async fn linear_regression(
        &self,
        region: &str,
    ) -> std::result::Result<RegressionResponse, ApiError> {
        let body = ProvinceRequest {
            provinsi: region.to_string(),
        };
        self.post_json(REGRESSION_PATH, &body).await
    }

    pub async fn extrapolation(
        &self,
        region: &str,
    ) -> std::result::Result<ExtrapolationResponse, ApiError> {
        let body = ProvinceRequest {
            provinsi: region.to_string(),
        };
        self.post_json(EXTRAPOLATION_PATH, &body).await
    }
}

fn decode_plot(encoded: Option<String>) -> std::result::Result<Option<Plot>, ApiError> {
    match encoded {
        Some(s) if !s.trim().is_empty() => Plot::from_base64(&s)
            .map(Some)
            .map_err(|e| ApiError::Parse(format!("invalid plot image: {}", e))),
        _ => Ok(None),
    }
}

/// サービスは成長率を比率で返すので、ローカル予測と同じパーセントに揃える
fn fraction_to_percent(fraction: Option<f64>) -> Option<f64> {
    fraction.map(|f| f * 100.0)
}

impl RegressionResponse {
    /// 受信したフィールドを名前どおりに写す（成長率の入れ替えはしない）
    pub fn into_result(
        self,
        region: &str,
        period: Period,
    ) -> std::result::Result<PredictionResult, ApiError> {
        let covariates = match (self.penduduk_2024, self.pendapatan_2024) {
            (Some(population), Some(income)) => Some((population, income)),
            _ => None,
        };
        Ok(PredictionResult::Regression(RegressionForecast {
            region: region.to_string(),
            period,
            value: self.data,
            primary_growth: fraction_to_percent(self.growth_penduduk),
            secondary_growth: fraction_to_percent(self.growth_pendapatan),
            covariates,
            accuracy: Accuracy::from_remote(self.accurate, self.galat),
            plot: decode_plot(self.plot)?,
        }))
    }
}

impl ExtrapolationResponse {
    pub fn into_result(
        self,
        region: &str,
        period: Period,
    ) -> std::result::Result<PredictionResult, ApiError> {
        Ok(PredictionResult::Extrapolation(ExtrapolationForecast {
            region: region.to_string(),
            period,
            value: self.data,
            growth: fraction_to_percent(self.growth_rate),
            plot: decode_plot(self.plot)?,
        }))
    }
}

#[async_trait]
impl PredictionService for ForecastApiClient {
    async fn provinces(&self) -> Result<Vec<String>> {
        Ok(self.get_provinces().await?)
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let period = Period::from_label(&self.config.period);
        let result = match request.algorithm {
            Algorithm::Regression => self
                .linear_regression(&request.region)
                .await?
                .into_result(&request.region, period)?,
            Algorithm::Extrapolation => self
                .extrapolation(&request.region)
                .await?
                .into_result(&request.region, period)?,
        };
        Ok(result)
    }
}
