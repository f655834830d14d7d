
use crate::api::{PredictionRequest, PredictionService};
use crate::errors::{ForecastError, Result};
use crate::logging::*;
use crate::metrics::{Accuracy, growth};
use crate::predict::{Algorithm, CovariateVector, RegressionModel, extrapolate, next_year};
use crate::result::{ExtrapolationForecast, Period, PredictionResult, RegressionForecast};
use crate::series::{TimeSeries, TimeSeriesPoint};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// データセットの 1 行（地域・年ごとの人口、所得、エネルギー消費）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    #[serde(rename = "Nama Provinsi")]
    pub province: String,
    #[serde(rename = "Tahun")]
    pub year: i32,
    /// 百万人
    #[serde(rename = "Jumlah Penduduk (juta)")]
    pub population: f64,
    /// 百万 IDR / 人 / 年
    #[serde(rename = "Pendapatan (juta IDR/kapita/tahun)")]
    pub income: f64,
    /// kkal / 人 / 日
    #[serde(rename = "Konsumsi Energi (kkal/kap/hari)")]
    pub consumption: f64,
}

/// 地域別の履歴データ
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<ProvinceRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ProvinceRecord>) -> Self {
        Self { records }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read dataset {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<ProvinceRecord>, csv::Error>>()?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 出現順で重複を除いた地域名
    pub fn provinces(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            if !names.contains(&record.province) {
                names.push(record.province.clone());
            }
        }
        names
    }

    /// 指定地域の行を年の昇順で返す
    pub fn records_for(&self, province: &str) -> Vec<&ProvinceRecord> {
        let mut rows: Vec<&ProvinceRecord> = self
            .records
            .iter()
            .filter(|r| r.province == province)
            .collect();
        rows.sort_by_key(|r| r.year);
        rows
    }

    /// 指定地域のエネルギー消費系列
    pub fn consumption_series(&self, province: &str) -> Result<TimeSeries> {
        let mut series = TimeSeries::new();
        for record in self.records_for(province) {
            series.push(TimeSeriesPoint::new(record.year, record.consumption))?;
        }
        Ok(series)
    }
}

/// ネットワークを使わずデータセットと注入された回帰モデルで予測する
pub struct LocalService {
    dataset: Dataset,
    model: RegressionModel,
}

impl LocalService {
    pub fn new(dataset: Dataset, model: RegressionModel) -> Self {
        Self { dataset, model }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn rows(&self, region: &str) -> Result<Vec<&ProvinceRecord>> {
        let rows = self.dataset.records_for(region);
        if rows.is_empty() {
            return Err(ForecastError::Validation(format!(
                "no data for region {:?}",
                region
            )));
        }
        if rows.len() < 2 {
            return Err(ForecastError::InsufficientData {
                required: 2,
                actual: rows.len(),
            });
        }
        Ok(rows)
    }

    /// 人口と所得の平均成長率から次期の共変量を見積もり、回帰モデルで予測する
    pub fn regression(&self, region: &str) -> Result<RegressionForecast> {
        let log = DEFAULT.new(o!(
            "function" => "LocalService::regression",
            "region" => region.to_string(),
        ));
        let rows = self.rows(region)?;

        let populations: Vec<f64> = rows.iter().map(|r| r.population).collect();
        let incomes: Vec<f64> = rows.iter().map(|r| r.income).collect();
        let population_growth = growth::mean_rate(&populations)?;
        let income_growth = growth::mean_rate(&incomes)?;

        let last = rows[rows.len() - 1];
        let period = next_year(last.year)?;
        let next_population = growth::project(last.population, population_growth);
        let next_income = growth::project(last.income, income_growth);
        let value = self
            .model
            .predict(&CovariateVector::from([next_population, next_income]))?;

        let observed: Vec<f64> = rows.iter().map(|r| r.consumption).collect();
        let fitted = rows
            .iter()
            .map(|r| self.model.predict(&CovariateVector::from([r.population, r.income])))
            .collect::<Result<Vec<f64>>>()?;
        let accuracy = match Accuracy::evaluate(&observed, &fitted) {
            Ok(accuracy) => Some(accuracy),
            Err(ForecastError::DivisionByZero) => {
                warn!(log, "accuracy not applicable: zero observation");
                None
            }
            Err(e) => return Err(e),
        };

        info!(log, "regression forecast";
            "period" => period,
            "value" => value,
            "population_growth" => population_growth,
            "income_growth" => income_growth
        );

        Ok(RegressionForecast {
            region: region.to_string(),
            period: Period::Year(period),
            value,
            primary_growth: Some(population_growth),
            secondary_growth: Some(income_growth),
            covariates: Some((next_population, next_income)),
            accuracy,
            plot: None,
        })
    }

    /// 消費系列の始点と終点から次期を外挿する
    pub fn extrapolation(&self, region: &str) -> Result<ExtrapolationForecast> {
        let log = DEFAULT.new(o!(
            "function" => "LocalService::extrapolation",
            "region" => region.to_string(),
        ));
        self.rows(region)?;
        let series = self.dataset.consumption_series(region)?;
        let predicted = extrapolate(&series)?;

        let growth = series.sorted().last().and_then(|last| {
            let rate = growth::rate_or_na(last.value, predicted.value);
            if rate.is_none() {
                warn!(log, "growth not applicable: zero baseline"; "year" => last.year);
            }
            rate
        });

        info!(log, "extrapolation forecast";
            "period" => predicted.period,
            "value" => predicted.value,
            "slope" => predicted.slope
        );

        Ok(ExtrapolationForecast {
            region: region.to_string(),
            period: Period::Year(predicted.period),
            value: predicted.value,
            growth,
            plot: None,
        })
    }
}

#[async_trait]
impl PredictionService for LocalService {
    async fn provinces(&self) -> Result<Vec<String>> {
        Ok(self.dataset.provinces())
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        match request.algorithm {
            Algorithm::Regression => self.regression(&request.region).map(PredictionResult::Regression),
            Algorithm::Extrapolation => self
                .extrapolation(&request.region)
                .map(PredictionResult::Extrapolation),
        }
    }
}
