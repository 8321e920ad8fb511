//! API route handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::envelope::ApiError;
use crate::config::defaults::{EXPERIMENTS_DEFAULT_LIMIT, EXPERIMENTS_MAX_LIMIT};
use crate::simulator::Simulator;
use crate::types::{ExperimentRecord, SimulationRequest, SimulationResult};

// ============================================================================
// Simulation
// ============================================================================

/// POST /simulate - Score a crop, record the experiment, return score and advice
pub async fn simulate(
    State(simulator): State<Simulator>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<SimulationResult>, ApiError> {
    let Json(request) = payload?;
    let result = simulator.run(&request).await?;
    Ok(Json(result))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Liveness probe, no side effects
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Experiment log
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ExperimentsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExperimentsResponse {
    pub collection: String,
    pub total: usize,
    pub records: Vec<ExperimentRecord>,
}

/// GET /experiments?limit=N - Most recent experiment records, newest first
pub async fn list_experiments(
    State(simulator): State<Simulator>,
    query: Result<Query<ExperimentsQuery>, QueryRejection>,
) -> Result<Json<ExperimentsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(EXPERIMENTS_DEFAULT_LIMIT)
        .min(EXPERIMENTS_MAX_LIMIT);

    let recorder = simulator.recorder();
    let records = recorder
        .recent(limit)
        .map_err(|e| ApiError::Persistence(e.to_string()))?;
    let total = recorder
        .count()
        .map_err(|e| ApiError::Persistence(e.to_string()))?;

    Ok(Json(ExperimentsResponse {
        collection: recorder.collection().to_string(),
        total,
        records,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::ClimateProvider;
    use crate::predictor::DeterministicPredictor;
    use crate::rules::CropRuleTable;
    use crate::storage::InMemoryRecorder;
    use std::sync::Arc;

    fn create_test_simulator() -> Simulator {
        Simulator::new(
            CropRuleTable::default(),
            ClimateProvider::Banded { strict: false },
            Arc::new(DeterministicPredictor),
            Arc::new(InMemoryRecorder::new("simulations")),
        )
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_simulate_then_list() {
        let sim = create_test_simulator();
        let request = SimulationRequest::banded("wheat", "high", "medium");
        let Json(result) = simulate(State(sim.clone()), Ok(Json(request))).await.unwrap();
        assert_eq!(result.yield_score, 70.0);

        let query = Ok(Query(ExperimentsQuery { limit: Some(5) }));
        let Json(listing) = list_experiments(State(sim), query).await.unwrap();
        assert_eq!(listing.collection, "simulations");
        assert_eq!(listing.total, 1);
        assert_eq!(listing.records[0].yield_score, 70.0);
    }

    #[tokio::test]
    async fn test_list_limit_is_capped() {
        let sim = create_test_simulator();
        for _ in 0..3 {
            sim.run(&SimulationRequest::crop_only("rice")).await.unwrap();
        }
        let query = Ok(Query(ExperimentsQuery { limit: Some(0) }));
        let Json(listing) = list_experiments(State(sim.clone()), query).await.unwrap();
        assert!(listing.records.is_empty());
        assert_eq!(listing.total, 3);

        let query = Ok(Query(ExperimentsQuery::default()));
        let Json(listing) = list_experiments(State(sim), query).await.unwrap();
        assert_eq!(listing.records.len(), 3);
    }
}
