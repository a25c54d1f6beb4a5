//! HTTP surface.
//!
//! `axum` router binding the aggregator to `POST /v1/schedules`, `GET
//! /health`, `GET /ready`. Deserializes the search request, maps validation
//! failures to HTTP 422, and otherwise forwards to [`Aggregator::search`],
//! copying the three spec-mandated headers onto the response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::aggregator::Aggregator;
use crate::error::AggregatorError;
use crate::request::{ScheduleSearchRequest, ScheduleSearchRequestBody};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub cache_available: Arc<dyn Fn() -> bool + Send + Sync>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/v1/schedules", post(search_schedules))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "healthy": true,
        "service_id": "schedule-aggregator",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let cache_available = (state.cache_available)();
    Json(json!({
        "ready": cache_available,
        "dependencies": [
            {
                "name": "response-cache",
                "available": cache_available,
                "latency_ms": null,
            }
        ],
    }))
}

async fn search_schedules(
    State(state): State<AppState>,
    Json(body): Json<ScheduleSearchRequestBody>,
) -> Result<Response, AggregatorError> {
    let request = ScheduleSearchRequest::try_from(body).map_err(AggregatorError::from)?;
    let result = state.aggregator.search(request).await;

    let mut response = Json(result.envelope).into_response();
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-correlation-id"),
        HeaderValue::from_str(&result.correlation_id.to_string()).expect("uuid is valid header value"),
    );
    headers.insert(
        HeaderName::from_static("kn-count-schedules"),
        HeaderValue::from_str(&result.count_schedules.to_string()).expect("usize is valid header value"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static(result.cache_control),
    );

    Ok(response)
}
