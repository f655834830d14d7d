use super::*;
use crate::api::ApiError;
use crate::result::{ExtrapolationForecast, Period, PredictionResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use tokio::sync::oneshot;

type Outcome = Result<PredictionResult>;

/// 応答のタイミングをテスト側から制御できるサービス
#[derive(Default)]
struct GatedService {
    provinces: Vec<String>,
    gates: Mutex<HashMap<String, oneshot::Receiver<Outcome>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl GatedService {
    fn gate(&self, region: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(region.to_string(), rx);
        tx
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionService for GatedService {
    async fn provinces(&self) -> Result<Vec<String>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.provinces.clone())
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let gate = self.gates.lock().unwrap().remove(&request.region);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".to_string()).into())),
            None => Ok(forecast(&request.region, 1.0)),
        }
    }
}

fn forecast(region: &str, value: f64) -> PredictionResult {
    PredictionResult::Extrapolation(ExtrapolationForecast {
        region: region.to_string(),
        period: Period::Year(2024),
        value,
        growth: None,
        plot: None,
    })
}

fn request(region: &str) -> PredictionRequest {
    PredictionRequest::new(region, Algorithm::Extrapolation)
}

fn orchestrator(service: Arc<GatedService>) -> Arc<PredictionOrchestrator> {
    Arc::new(PredictionOrchestrator::new(service, Duration::from_secs(5)))
}

async fn wait_in_flight(rx: &mut watch::Receiver<OrchestrationState>, region: &str) {
    rx.wait_for(|s| matches!(s, OrchestrationState::InFlight(r) if r.region == region))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_starts_idle() {
    let orchestrator = orchestrator(Arc::new(GatedService::default()));
    assert_eq!(orchestrator.state(), OrchestrationState::Idle);
    assert_eq!(orchestrator.generation(), 0);
}

#[tokio::test]
async fn test_successful_prediction() {
    let service = Arc::new(GatedService::default());
    let orchestrator = orchestrator(service.clone());

    let state = orchestrator.predict(request("Aceh")).await;
    assert_eq!(state, OrchestrationState::Succeeded(forecast("Aceh", 1.0)));
    assert_eq!(orchestrator.state(), state);
    assert_eq!(orchestrator.generation(), 1);
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_empty_region_fails_validation_without_call() {
    let service = Arc::new(GatedService::default());
    let orchestrator = orchestrator(service.clone());

    for region in ["", "   "] {
        let state = orchestrator.predict(request(region)).await;
        assert!(matches!(
            state,
            OrchestrationState::Failed(ForecastError::Validation(_))
        ));
    }
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_unknown_region_after_loading_provinces() {
    let service = Arc::new(GatedService {
        provinces: vec!["Aceh".to_string(), "Bali".to_string()],
        ..Default::default()
    });
    let orchestrator = orchestrator(service.clone());

    let provinces = orchestrator.load_provinces().await.unwrap();
    assert_eq!(provinces, vec!["Aceh", "Bali"]);
    assert_eq!(orchestrator.provinces(), provinces);

    let state = orchestrator.predict(request("Atlantis")).await;
    assert!(matches!(
        state,
        OrchestrationState::Failed(ForecastError::Validation(_))
    ));
    assert_eq!(service.calls(), 0);

    let state = orchestrator.predict_selection("Bali", Algorithm::Extrapolation).await;
    assert_eq!(state, OrchestrationState::Succeeded(forecast("Bali", 1.0)));
}

#[tokio::test]
async fn test_region_is_trimmed_before_validation_and_call() {
    let service = Arc::new(GatedService {
        provinces: vec!["Aceh".to_string()],
        ..Default::default()
    });
    let orchestrator = orchestrator(service.clone());
    orchestrator.load_provinces().await.unwrap();
    let mut rx = orchestrator.subscribe();

    let gate = service.gate("Aceh");
    let o = orchestrator.clone();
    let task = tokio::spawn(async move { o.predict(request(" Aceh \t")).await });
    wait_in_flight(&mut rx, "Aceh").await;
    assert_eq!(orchestrator.state().request(), Some(&request("Aceh")));

    gate.send(Ok(forecast("Aceh", 5.0))).unwrap();
    assert_eq!(
        task.await.unwrap(),
        OrchestrationState::Succeeded(forecast("Aceh", 5.0))
    );
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_remote_error_is_failed_state() {
    let service = Arc::new(GatedService::default());
    let gate = service.gate("Aceh");
    let orchestrator = orchestrator(service);

    let error = ForecastError::Remote(ApiError::Server("HTTP Error 500".to_string()));
    gate.send(Err(error.clone())).unwrap();
    let state = orchestrator.predict(request("Aceh")).await;
    assert_eq!(state, OrchestrationState::Failed(error));
}

#[tokio::test]
async fn test_timeout_is_failed_state() {
    let service = Arc::new(GatedService {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let timeout = Duration::from_millis(50);
    let orchestrator = PredictionOrchestrator::new(service, timeout);

    let state = orchestrator.predict(request("Aceh")).await;
    assert_eq!(state, OrchestrationState::Failed(ForecastError::Timeout(timeout)));

    assert_eq!(
        orchestrator.load_provinces().await,
        Err(ForecastError::Timeout(timeout))
    );
    assert!(orchestrator.provinces().is_empty());
}

#[tokio::test]
async fn test_later_request_wins_when_earlier_resolves_last() {
    let service = Arc::new(GatedService::default());
    let first_gate = service.gate("Aceh");
    let second_gate = service.gate("Bali");
    let orchestrator = orchestrator(service);
    let mut rx = orchestrator.subscribe();

    let o = orchestrator.clone();
    let first = tokio::spawn(async move { o.predict(request("Aceh")).await });
    wait_in_flight(&mut rx, "Aceh").await;

    let o = orchestrator.clone();
    let second = tokio::spawn(async move { o.predict(request("Bali")).await });
    wait_in_flight(&mut rx, "Bali").await;

    second_gate.send(Ok(forecast("Bali", 2.0))).unwrap();
    let second_state = second.await.unwrap();
    assert_eq!(second_state, OrchestrationState::Succeeded(forecast("Bali", 2.0)));

    // 古いリクエストの応答は後から届いても反映されない
    first_gate.send(Ok(forecast("Aceh", 1.0))).unwrap();
    let first_state = first.await.unwrap();
    assert_eq!(first_state, OrchestrationState::Succeeded(forecast("Bali", 2.0)));
    assert_eq!(
        orchestrator.state(),
        OrchestrationState::Succeeded(forecast("Bali", 2.0))
    );
    assert_eq!(orchestrator.generation(), 2);
}

#[tokio::test]
async fn test_stale_failure_is_discarded() {
    let service = Arc::new(GatedService::default());
    let first_gate = service.gate("Aceh");
    let second_gate = service.gate("Bali");
    let orchestrator = orchestrator(service);
    let mut rx = orchestrator.subscribe();

    let o = orchestrator.clone();
    let first = tokio::spawn(async move { o.predict(request("Aceh")).await });
    wait_in_flight(&mut rx, "Aceh").await;

    let o = orchestrator.clone();
    let second = tokio::spawn(async move { o.predict(request("Bali")).await });
    wait_in_flight(&mut rx, "Bali").await;

    // 古いリクエストが先に失敗しても、新しいリクエストは実行中のまま
    first_gate
        .send(Err(ForecastError::Remote(ApiError::Network("reset".to_string()))))
        .unwrap();
    first.await.unwrap();
    assert_eq!(
        orchestrator.state(),
        OrchestrationState::InFlight(request("Bali"))
    );

    second_gate.send(Ok(forecast("Bali", 3.0))).unwrap();
    second.await.unwrap();
    assert_eq!(
        orchestrator.state(),
        OrchestrationState::Succeeded(forecast("Bali", 3.0))
    );
}

#[tokio::test]
async fn test_new_trigger_replaces_previous_result() {
    let service = Arc::new(GatedService::default());
    let orchestrator = orchestrator(service.clone());

    let state = orchestrator.predict(request("Aceh")).await;
    assert!(state.result().is_some());

    let gate = service.gate("Bali");
    gate.send(Err(ForecastError::InsufficientData {
        required: 2,
        actual: 1,
    }))
    .unwrap();
    let state = orchestrator.predict(request("Bali")).await;
    assert_eq!(state.result(), None);
    assert!(matches!(
        state,
        OrchestrationState::Failed(ForecastError::InsufficientData { .. })
    ));

    let state = orchestrator.predict(request("Aceh")).await;
    assert_eq!(state, OrchestrationState::Succeeded(forecast("Aceh", 1.0)));
}

#[tokio::test]
async fn test_subscriber_observes_latest_state() {
    let service = Arc::new(GatedService::default());
    let gate = service.gate("Aceh");
    let orchestrator = orchestrator(service);
    let mut rx = orchestrator.subscribe();

    let o = orchestrator.clone();
    let task = tokio::spawn(async move { o.predict(request("Aceh")).await });
    wait_in_flight(&mut rx, "Aceh").await;
    assert!(orchestrator.state().is_busy());

    gate.send(Ok(forecast("Aceh", 4.0))).unwrap();
    task.await.unwrap();

    let observed = rx
        .wait_for(|s| matches!(s, OrchestrationState::Succeeded(_)))
        .await
        .unwrap()
        .clone();
    assert_eq!(observed, OrchestrationState::Succeeded(forecast("Aceh", 4.0)));
}
