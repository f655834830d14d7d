
use crate::api::{ForecastApiClient, PredictionService};
use crate::config;
use crate::dataset::{Dataset, LocalService};
use crate::display;
use crate::logging::*;
use crate::metrics::growth;
use crate::orchestrator::{OrchestrationState, PredictionOrchestrator};
use crate::predict::{self, Algorithm, CovariateVector, RegressionModel};
use crate::result::PredictionResult;
use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[clap(name = "energy-forecast")]
#[clap(about = "Next-period energy consumption forecasts per province")]
#[clap(version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 予測できる地域の一覧
    Provinces(ProvincesArgs),
    /// 地域を選んで予測する
    Predict(PredictArgs),
    /// 共変量から回帰モデルで直接予測する
    Regression(RegressionArgs),
    /// `year,value` 形式の系列を外挿する
    Extrapolate(ExtrapolateArgs),
    /// 2 期間の成長率
    Growth(GrowthArgs),
}

#[derive(Debug, Args)]
pub struct ProvincesArgs {
    /// リモートサービスではなくローカルのデータセットを使う
    #[arg(long)]
    pub local: bool,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// 地域名
    pub province: String,

    /// 予測アルゴリズム
    #[arg(short, long, value_enum, default_value_t = Algorithm::Regression)]
    pub algorithm: Algorithm,

    /// リモートサービスではなくローカルのデータセットを使う
    #[arg(long)]
    pub local: bool,

    /// グラフ画像（PNG）の保存先
    #[arg(long)]
    pub plot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RegressionArgs {
    /// モデルの係数と同じ順序の共変量
    #[arg(required = true, allow_negative_numbers = true)]
    pub covariates: Vec<f64>,
}

#[derive(Debug, Args)]
pub struct ExtrapolateArgs {
    /// 入力ファイル。省略時は標準入力
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GrowthArgs {
    #[arg(allow_negative_numbers = true)]
    pub previous: f64,

    #[arg(allow_negative_numbers = true)]
    pub current: f64,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Provinces(args) => run_provinces(args).await,
        Commands::Predict(args) => run_predict(args).await,
        Commands::Regression(args) => run_regression(args),
        Commands::Extrapolate(args) => run_extrapolate(args),
        Commands::Growth(args) => {
            println!("{}", growth_output(args.previous, args.current));
            Ok(())
        }
    }
}

/// 設定に従って予測サービスを組み立てる
fn service(local: bool) -> Result<Arc<dyn PredictionService>> {
    if local {
        let path = config::dataset_path()?;
        let dataset = Dataset::from_path(&path)?;
        Ok(Arc::new(LocalService::new(dataset, config::regression_model()?)))
    } else {
        Ok(Arc::new(ForecastApiClient::new(config::api_client_config()?)))
    }
}

async fn run_provinces(args: ProvincesArgs) -> Result<()> {
    let timeout = config::api_client_config()?.timeout;
    let orchestrator = PredictionOrchestrator::new(service(args.local)?, timeout);
    for province in orchestrator.load_provinces().await? {
        println!("{}", province);
    }
    Ok(())
}

async fn run_predict(args: PredictArgs) -> Result<()> {
    let timeout = config::api_client_config()?.timeout;
    let result = forecast(service(args.local)?, timeout, &args.province, args.algorithm).await?;
    print!("{}", display::render_result(&result));

    if let Some(path) = &args.plot {
        save_plot(&result, path)?;
        println!("Plot written to {}", path.display());
    }
    Ok(())
}

/// 地域一覧を読み込んでから 1 回予測する
pub async fn forecast(
    service: Arc<dyn PredictionService>,
    timeout: Duration,
    province: &str,
    algorithm: Algorithm,
) -> Result<PredictionResult> {
    let log = DEFAULT.new(o!("function" => "commands::forecast"));

    let orchestrator = PredictionOrchestrator::new(service, timeout);
    if let Err(e) = orchestrator.load_provinces().await {
        warn!(log, "continuing without province list"; "error" => %e);
    }

    match orchestrator.predict_selection(province, algorithm).await {
        OrchestrationState::Succeeded(result) => Ok(result),
        OrchestrationState::Failed(e) => Err(e.into()),
        other => Err(anyhow!("prediction ended in state {}", other.name())),
    }
}

pub fn save_plot(result: &PredictionResult, path: &Path) -> Result<()> {
    let plot = result
        .plot()
        .ok_or_else(|| anyhow!("prediction for {} has no plot", result.region()))?;
    plot.write_to(path)
        .with_context(|| format!("Failed to write plot to {}", path.display()))
}

fn run_regression(args: RegressionArgs) -> Result<()> {
    let model = config::regression_model()?;
    println!("{}", regression_output(&model, args.covariates)?);
    Ok(())
}

pub fn regression_output(model: &RegressionModel, covariates: Vec<f64>) -> Result<String> {
    let value = model.predict(&CovariateVector::new(covariates))?;
    Ok(display::format_energy(value))
}

fn run_extrapolate(args: ExtrapolateArgs) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    println!("{}", extrapolation_output(&text)?);
    Ok(())
}

pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

pub fn extrapolation_output(text: &str) -> Result<String> {
    let extrapolation = predict::extrapolate_text(text)?;
    Ok(format!(
        "{}: {}",
        extrapolation.period,
        display::format_energy(extrapolation.value)
    ))
}

/// 基準が 0 の場合は `N/A`
pub fn growth_output(previous: f64, current: f64) -> String {
    display::or_na(growth::rate_or_na(previous, current), display::format_growth)
}
