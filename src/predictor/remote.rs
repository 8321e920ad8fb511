//! Remote prediction client for `POST {base_url}/predict`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{PredictionError, YieldPredictor};
use crate::climate::ClimateInput;

/// Body sent to the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub rainfall_mm: f64,
    pub temperature_c: f64,
    pub ndvi: f64,
}

/// Expected reply from the prediction service. Extra keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_yield: f64,
}

/// HTTP client for the prediction service
#[derive(Clone)]
pub struct RemotePredictor {
    http: reqwest::Client,
    predict_url: String,
}

impl RemotePredictor {
    /// `base_url` is the service root; `/predict` is appended. A URL that
    /// already ends in `/predict` is used unchanged.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PredictionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let trimmed = base_url.trim_end_matches('/');
        let predict_url = if trimmed.ends_with("/predict") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/predict")
        };
        Ok(Self { http, predict_url })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    /// Call the service with measured climate.
    pub async fn request(&self, body: &PredictRequest) -> Result<f64, PredictionError> {
        let resp = self.http.post(&self.predict_url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PredictionError::ServerError(status));
        }

        let bytes = resp.bytes().await?;
        let parsed: PredictResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PredictionError::MalformedResponse(e.to_string()))?;
        if !parsed.predicted_yield.is_finite() {
            return Err(PredictionError::MalformedResponse(format!(
                "predicted_yield is not finite ({})",
                parsed.predicted_yield
            )));
        }

        debug!(predicted_yield = parsed.predicted_yield, "Prediction service replied");
        Ok(parsed.predicted_yield)
    }
}

#[async_trait]
impl YieldPredictor for RemotePredictor {
    async fn predict(&self, _base_yield: f64, climate: &ClimateInput) -> Result<f64, PredictionError> {
        let ClimateInput::Measured(snapshot) = climate else {
            return Err(PredictionError::UnsupportedInput);
        };
        let body = PredictRequest {
            rainfall_mm: snapshot.rainfall_mm,
            temperature_c: snapshot.temperature_celsius,
            ndvi: snapshot.ndvi,
        };
        self.request(&body).await
    }

    fn strategy_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClimateSnapshot;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::net::SocketAddr;

    async fn spawn_service(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        addr
    }

    fn measured() -> ClimateInput {
        ClimateInput::Measured(ClimateSnapshot {
            rainfall_mm: 120.0,
            temperature_celsius: 25.0,
            ndvi: 0.6,
        })
    }

    #[tokio::test]
    async fn test_remote_returns_value_unclamped() {
        let app = Router::new().route(
            "/predict",
            post(|Json(body): Json<PredictRequest>| async move {
                // Echo enough of the input to prove the body shape.
                let value = body.rainfall_mm + body.temperature_c + body.ndvi;
                Json(serde_json::json!({ "predicted_yield": value, "model": "v3" }))
            }),
        );
        let addr = spawn_service(app).await;

        let predictor = RemotePredictor::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let score = predictor.predict(50.0, &measured()).await.unwrap();
        assert!((score - 145.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_remote_server_error_propagates() {
        let app = Router::new().route("/predict", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let addr = spawn_service(app).await;

        let predictor = RemotePredictor::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
        let err = predictor.predict(50.0, &measured()).await.unwrap_err();
        assert!(matches!(err, PredictionError::ServerError(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_remote_missing_field_is_malformed() {
        let app = Router::new().route(
            "/predict",
            post(|| async { Json(serde_json::json!({ "yield": 71.0 })) }),
        );
        let addr = spawn_service(app).await;

        let predictor = RemotePredictor::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = predictor.predict(50.0, &measured()).await.unwrap_err();
        assert!(matches!(err, PredictionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_remote_times_out() {
        let app = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "predicted_yield": 60.0 }))
            }),
        );
        let addr = spawn_service(app).await;

        let predictor =
            RemotePredictor::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let err = predictor.predict(50.0, &measured()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Http(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_remote_rejects_banded_input() {
        let predictor = RemotePredictor::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let climate = ClimateInput::Bands {
            rainfall: None,
            temperature: None,
        };
        let err = predictor.predict(50.0, &climate).await.unwrap_err();
        assert!(matches!(err, PredictionError::UnsupportedInput));
    }

    #[test]
    fn test_predict_url_normalization() {
        let a = RemotePredictor::new("https://ml.example.com/", Duration::from_secs(1)).unwrap();
        let b = RemotePredictor::new("https://ml.example.com/predict", Duration::from_secs(1)).unwrap();
        assert_eq!(a.predict_url(), "https://ml.example.com/predict");
        assert_eq!(b.predict_url(), "https://ml.example.com/predict");
    }
}
