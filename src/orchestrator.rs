//! 地域・アルゴリズムの選択から予測結果の表示までを順序付けるコントローラー
//!
//! 状態の変更はすべてこのモジュールを通る。新しいリクエストを開始するたびに
//! 世代番号を進め、完了時に世代が一致しない応答は成功・失敗を問わず破棄する。
//! そのため公開される状態は常に最後に「開始された」リクエストに対応する。

pub mod state;

pub use self::state::{Event, OrchestrationState};

#[cfg(test)]
mod tests;

use crate::api::{PredictionRequest, PredictionService};
use crate::errors::{ForecastError, Result};
use crate::logging::*;
use crate::predict::Algorithm;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub struct PredictionOrchestrator {
    service: Arc<dyn PredictionService>,
    timeout: Duration,
    generation: AtomicU64,
    state: watch::Sender<OrchestrationState>,
    provinces: Mutex<Vec<String>>,
}

impl PredictionOrchestrator {
    /// `Idle` 状態で生成する
    pub fn new(service: Arc<dyn PredictionService>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(OrchestrationState::Idle);
        Self {
            service,
            timeout,
            generation: AtomicU64::new(0),
            state,
            provinces: Mutex::new(Vec::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 現在の状態のスナップショット
    pub fn state(&self) -> OrchestrationState {
        self.state.borrow().clone()
    }

    /// 表示層が状態遷移を購読するためのレシーバー
    pub fn subscribe(&self) -> watch::Receiver<OrchestrationState> {
        self.state.subscribe()
    }

    /// 最後に開始したリクエストの世代番号
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 読み込み済みの地域一覧
    pub fn provinces(&self) -> Vec<String> {
        self.provinces
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// 地域一覧を取得してキャッシュする
    pub async fn load_provinces(&self) -> Result<Vec<String>> {
        let log = DEFAULT.new(o!("function" => "PredictionOrchestrator::load_provinces"));

        let provinces = match tokio::time::timeout(self.timeout, self.service.provinces()).await {
            Ok(result) => result,
            Err(_) => Err(ForecastError::Timeout(self.timeout)),
        }
        .inspect_err(|e| warn!(log, "failed to load provinces"; "error" => %e))?;

        info!(log, "provinces loaded"; "count" => provinces.len());
        if let Ok(mut cache) = self.provinces.lock() {
            *cache = provinces.clone();
        }
        Ok(provinces)
    }

    /// 予測を 1 回実行し、このリクエストの処理後の状態を返す
    ///
    /// 途中で新しいリクエストが開始された場合、このリクエストの結果は破棄され、
    /// 返り値は新しいリクエスト側の状態になる。
    pub async fn predict(&self, request: PredictionRequest) -> OrchestrationState {
        // 前後の空白を落とした地域名で検証・送信・公開する
        let request = PredictionRequest::new(request.region.trim(), request.algorithm);
        let token = self.begin(request.clone());
        let log = DEFAULT.new(o!(
            "function" => "PredictionOrchestrator::predict",
            "generation" => token,
            "region" => request.region.clone(),
            "algorithm" => request.algorithm.as_str(),
        ));

        if let Err(e) = self.validate(&request) {
            warn!(log, "validation failed"; "error" => %e);
            self.apply(&log, token, Event::Rejected(e));
            return self.state();
        }
        if !self.apply(&log, token, Event::Validated) {
            return self.state();
        }

        let outcome = match tokio::time::timeout(self.timeout, self.service.predict(&request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ForecastError::Timeout(self.timeout)),
        };

        let event = match outcome {
            Ok(result) => Event::Resolved(result),
            Err(e) => {
                warn!(log, "prediction failed"; "error" => %e);
                Event::Errored(e)
            }
        };
        self.apply(&log, token, event);
        self.state()
    }

    /// 選択をそのまま受け取って予測する
    pub async fn predict_selection(&self, region: &str, algorithm: Algorithm) -> OrchestrationState {
        self.predict(PredictionRequest::new(region, algorithm)).await
    }

    /// 世代を進めて `Validating` に入る。世代の更新と状態の公開は同じロックの中で行う。
    fn begin(&self, request: PredictionRequest) -> u64 {
        let mut token = 0;
        self.state.send_modify(|state| {
            token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(next) = state.next(Event::Trigger(request)) {
                *state = next;
            }
        });
        token
    }

    fn validate(&self, request: &PredictionRequest) -> Result<()> {
        let region = request.region.as_str();
        if region.is_empty() {
            return Err(ForecastError::Validation(
                "region must be selected".to_string(),
            ));
        }
        let provinces = self.provinces();
        if !provinces.is_empty() && !provinces.iter().any(|p| p == region) {
            return Err(ForecastError::Validation(format!(
                "unknown region {:?}",
                region
            )));
        }
        Ok(())
    }

    /// 世代が最新のときだけイベントを適用する。適用したら true。
    fn apply(&self, log: &Logger, token: u64, event: Event) -> bool {
        self.state.send_if_modified(|state| {
            let current = self.generation.load(Ordering::SeqCst);
            if current != token {
                info!(log, "discarding stale response"; "latest_generation" => current);
                return false;
            }
            match state.next(event) {
                Some(next) => {
                    debug!(log, "state transition"; "from" => state.name(), "to" => next.name());
                    *state = next;
                    true
                }
                None => {
                    warn!(log, "ignoring event in current state"; "state" => state.name());
                    false
                }
            }
        })
    }
}
