
use crate::api::PredictionRequest;
use crate::errors::ForecastError;
use crate::result::PredictionResult;

/// 予測リクエストのライフサイクル
///
/// `Succeeded` と `Failed` は次のトリガーまで表示され続ける安定状態で、終端状態は無い。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OrchestrationState {
    #[default]
    Idle,
    Validating(PredictionRequest),
    InFlight(PredictionRequest),
    Succeeded(PredictionResult),
    Failed(ForecastError),
}

/// 状態を進めるイベント
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// ユーザーが予測を実行した
    Trigger(PredictionRequest),
    /// 入力検証に通った
    Validated,
    /// 入力検証に失敗した（リモート呼び出しはしない）
    Rejected(ForecastError),
    /// 予測が完了した
    Resolved(PredictionResult),
    /// 予測が失敗した（リモートエラー、タイムアウト、ローカル予測器のエラー）
    Errored(ForecastError),
}

impl OrchestrationState {
    /// `(state, event) -> state` の純粋な遷移関数。適用できないイベントには `None`。
    pub fn next(&self, event: Event) -> Option<Self> {
        use OrchestrationState::*;

        match (self, event) {
            // 実行中でも新しいトリガーが前のリクエストを置き換える
            (_, Event::Trigger(request)) => Some(Validating(request)),
            (Validating(request), Event::Validated) => Some(InFlight(request.clone())),
            (Validating(_), Event::Rejected(error)) => Some(Failed(error)),
            (InFlight(_), Event::Resolved(result)) => Some(Succeeded(result)),
            (InFlight(_), Event::Errored(error)) => Some(Failed(error)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating(_) => "validating",
            Self::InFlight(_) => "in_flight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating(_) | Self::InFlight(_))
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ForecastError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&PredictionRequest> {
        match self {
            Self::Validating(request) | Self::InFlight(request) => Some(request),
            _ => None,
        }
    }
}
