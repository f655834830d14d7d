use crate::api::ApiClientConfig;
use crate::predict::RegressionModel;
use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// TOML configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub regression: RegressionConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_forecast_period")]
    pub forecast_period: String,
}

/// 回帰モデルは設定から注入する。組み込みの既定値は持たない。
#[derive(Debug, Deserialize, Default)]
pub struct RegressionConfig {
    pub intercept: Option<f64>,
    pub coefficients: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default values
fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_timeout() -> String {
    "30s".to_string()
}
fn default_forecast_period() -> String {
    "2024".to_string()
}
fn default_dataset_path() -> String {
    "data/dummy_data.csv".to_string()
}
fn default_log_format() -> String {
    "term".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            forecast_period: default_forecast_period(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

static CONFIG: Lazy<Config> = Lazy::new(|| {
    load_config().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config files: {}. Using defaults.",
            e
        );
        Config::default()
    })
});

static CONFIG_STORE: Lazy<Arc<Mutex<HashMap<String, String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(HashMap::new())));

pub fn get(name: &str) -> Result<String> {
    // Priority 1: CONFIG_STORE (runtime overrides)
    if let Some(value) = get_from_store(name) {
        if value.is_empty() {
            return Err(anyhow!("{} is empty", name));
        }
        return Ok(value);
    }

    // Priority 2: Environment variables
    if let Ok(val) = std::env::var(name)
        && !val.is_empty()
    {
        return Ok(val);
    }

    // Priority 3: TOML config
    if let Some(value) = toml_value(&CONFIG, name)
        && !value.is_empty()
    {
        return Ok(value);
    }

    Err(anyhow!("Configuration key not found: {}", name))
}

/// 実行時に値を上書きする（環境変数・TOML より優先）
pub fn set(name: &str, value: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.insert(name.to_string(), value.to_string());
    }
}

fn toml_value(config: &Config, name: &str) -> Option<String> {
    match name {
        "API_BASE_URL" => Some(config.api.base_url.clone()),
        "API_TIMEOUT" => Some(config.api.timeout.clone()),
        "FORECAST_PERIOD" => Some(config.api.forecast_period.clone()),
        "REGRESSION_INTERCEPT" => config.regression.intercept.map(|v| v.to_string()),
        "REGRESSION_COEFFICIENTS" => config
            .regression
            .coefficients
            .as_deref()
            .map(join_coefficients),
        "DATASET_PATH" => Some(config.dataset.path.clone()),
        "LOG_FORMAT" => Some(config.logging.format.clone()),
        _ => None,
    }
}

fn get_from_store(name: &str) -> Option<String> {
    if let Ok(store) = CONFIG_STORE.lock() {
        store.get(name).cloned()
    } else {
        None
    }
}

fn join_coefficients(coefficients: &[f64]) -> String {
    coefficients
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// カンマ区切りの係数列をパースする
fn parse_coefficients(value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid regression coefficient: {:?}", s))
        })
        .collect()
}

/// Load configuration from TOML files with priority:
/// 1. config/config.local.toml (git-ignored, for local overrides)
/// 2. config/config.toml (git-managed template)
/// 3. Default values
fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let base_path = "config/config.toml";
    if Path::new(base_path).exists() {
        let content = fs::read_to_string(base_path)?;
        config = toml::from_str(&content)?;
    }

    let local_path = "config/config.local.toml";
    if Path::new(local_path).exists() {
        let content = fs::read_to_string(local_path)?;
        let local_config: Config = toml::from_str(&content)?;
        merge_config(&mut config, local_config);
    }

    Ok(config)
}

/// Merge local config into base config (local values override base values)
fn merge_config(base: &mut Config, local: Config) {
    // API
    if local.api.base_url != default_base_url() {
        base.api.base_url = local.api.base_url;
    }
    if local.api.timeout != default_timeout() {
        base.api.timeout = local.api.timeout;
    }
    if local.api.forecast_period != default_forecast_period() {
        base.api.forecast_period = local.api.forecast_period;
    }

    // Regression
    if local.regression.intercept.is_some() {
        base.regression.intercept = local.regression.intercept;
    }
    if local.regression.coefficients.is_some() {
        base.regression.coefficients = local.regression.coefficients;
    }

    // Dataset
    if local.dataset.path != default_dataset_path() {
        base.dataset.path = local.dataset.path;
    }

    // Logging
    if local.logging.format != default_log_format() {
        base.logging.format = local.logging.format;
    }
}

/// Get TOML-based configuration
pub fn config() -> &'static Config {
    &CONFIG
}

/// リモート予測サービスへの接続設定
pub fn api_client_config() -> Result<ApiClientConfig> {
    let timeout: Duration = humantime::parse_duration(&get("API_TIMEOUT")?)
        .context("Invalid API_TIMEOUT")?;
    Ok(ApiClientConfig::new(get("API_BASE_URL")?)
        .with_timeout(timeout)
        .with_period(get("FORECAST_PERIOD")?))
}

/// 設定から注入される回帰モデル（係数はコンパイル時定数にしない）
pub fn regression_model() -> Result<RegressionModel> {
    let intercept: f64 = get("REGRESSION_INTERCEPT")?
        .trim()
        .parse()
        .context("Invalid REGRESSION_INTERCEPT")?;
    let coefficients = parse_coefficients(&get("REGRESSION_COEFFICIENTS")?)?;
    if coefficients.is_empty() {
        return Err(anyhow!("REGRESSION_COEFFICIENTS must not be empty"));
    }
    Ok(RegressionModel::new(intercept, coefficients))
}

pub fn dataset_path() -> Result<PathBuf> {
    get("DATASET_PATH").map(PathBuf::from)
}

pub fn forecast_period() -> Result<String> {
    get("FORECAST_PERIOD")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear(key: &str) {
        if let Ok(mut store) = CONFIG_STORE.lock() {
            store.remove(key);
        }
        unsafe {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_toml_default_values() {
        // 環境変数が無ければ TOML もしくはデフォルト値が使われる
        clear("API_BASE_URL");
        let result = get("API_BASE_URL").unwrap();
        assert_eq!(result, "http://127.0.0.1:5000");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_toml() {
        unsafe {
            std::env::set_var("DATASET_PATH", "/tmp/provinces.csv");
        }
        let result = dataset_path().unwrap();
        assert_eq!(result, PathBuf::from("/tmp/provinces.csv"));
        clear("DATASET_PATH");
    }

    #[test]
    #[serial]
    fn test_priority_order() {
        // 優先順位: CONFIG_STORE > 環境変数 > TOML > デフォルト
        const TEST_KEY: &str = "FORECAST_PERIOD";
        clear(TEST_KEY);
        assert_eq!(get(TEST_KEY).unwrap(), "2024");

        unsafe {
            std::env::set_var(TEST_KEY, "2025");
        }
        assert_eq!(get(TEST_KEY).unwrap(), "2025");

        set(TEST_KEY, "2026");
        assert_eq!(get(TEST_KEY).unwrap(), "2026");

        clear(TEST_KEY);
    }

    #[test]
    #[serial]
    fn test_empty_store_value_is_error() {
        set("LOG_FORMAT", "");
        assert!(get("LOG_FORMAT").is_err());
        clear("LOG_FORMAT");
    }

    #[test]
    fn test_unknown_key() {
        assert!(get("NO_SUCH_KEY_FOR_FORECAST").is_err());
    }

    #[test]
    #[serial]
    fn test_regression_model_from_toml() {
        clear("REGRESSION_INTERCEPT");
        clear("REGRESSION_COEFFICIENTS");
        let model = regression_model().unwrap();
        assert_eq!(model.intercept(), 1861.696284);
        assert_eq!(model.coefficients(), &[2.066805807, 4.434248106]);
    }

    #[test]
    #[serial]
    fn test_regression_model_injected() {
        set("REGRESSION_INTERCEPT", "10");
        set("REGRESSION_COEFFICIENTS", "1.5, 2 ,3");
        let model = regression_model().unwrap();
        assert_eq!(model.intercept(), 10.0);
        assert_eq!(model.coefficients(), &[1.5, 2.0, 3.0]);
        clear("REGRESSION_INTERCEPT");
        clear("REGRESSION_COEFFICIENTS");
    }

    #[test]
    #[serial]
    fn test_regression_model_rejects_garbage() {
        set("REGRESSION_COEFFICIENTS", "1.0,abc");
        assert!(regression_model().is_err());
        clear("REGRESSION_COEFFICIENTS");
    }

    #[test]
    #[serial]
    fn test_api_client_config_timeout() {
        set("API_TIMEOUT", "250ms");
        let config = api_client_config().unwrap();
        assert_eq!(config.timeout, Duration::from_millis(250));
        clear("API_TIMEOUT");

        set("API_TIMEOUT", "soon");
        assert!(api_client_config().is_err());
        clear("API_TIMEOUT");
    }

    #[test]
    fn test_merge_config_local_wins() {
        let mut base: Config = toml::from_str(
            r#"
            [regression]
            intercept = 1861.696284
            coefficients = [2.066805807, 4.434248106]
            "#,
        )
        .unwrap();
        let local: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://forecast.internal:5000"

            [regression]
            coefficients = [1.0]
            "#,
        )
        .unwrap();
        merge_config(&mut base, local);
        assert_eq!(base.api.base_url, "http://forecast.internal:5000");
        assert_eq!(base.api.timeout, "30s");
        assert_eq!(base.regression.coefficients, Some(vec![1.0]));
        assert_eq!(base.regression.intercept, Some(1861.696284));
    }

    #[test]
    fn test_missing_regression_section_has_no_model() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://127.0.0.1:5000"
            "#,
        )
        .unwrap();
        assert_eq!(toml_value(&config, "REGRESSION_INTERCEPT"), None);
        assert_eq!(toml_value(&config, "REGRESSION_COEFFICIENTS"), None);
        assert_eq!(
            toml_value(&config, "API_BASE_URL").as_deref(),
            Some("http://127.0.0.1:5000")
        );
    }
}
