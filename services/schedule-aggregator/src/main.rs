//! Schedule Aggregator Service
//!
//! P2P ocean-freight schedule aggregator exposing `GET /health`,
//! `GET /ready`, and `POST /v1/schedules` over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use freight_core::config::PoolConfig;
use freight_core::{DependencyStatus, FreightService, HealthStatus, ReadinessStatus, Result};
use schedule_aggregator::build_aggregator;
use schedule_aggregator::http_api::{create_router, AppState};
use schedule_aggregator::settings::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("schedule_aggregator=debug".parse().expect("valid tracing directive")),
        )
        .json()
        .init();

    info!("Starting Schedule Aggregator Service");

    let service = Arc::new(ScheduleAggregatorService::new()?);
    freight_core::MicroserviceRuntime::run(service).await
}

struct ScheduleAggregatorService {
    http_bind: String,
    state: AppState,
    start_time: std::time::Instant,
}

impl ScheduleAggregatorService {
    fn new() -> Result<Self> {
        let settings = Arc::new(Settings::from_env()?);
        let pool_config = std::env::var("POOL_CONFIG_PATH")
            .ok()
            .and_then(|path| PoolConfig::from_yaml_file(&path).ok())
            .unwrap_or_default();

        // Adapters and cache are built once and shared across every
        // request; only the per-request `Aggregator::search` call is
        // request-scoped.
        let aggregator = Arc::new(build_aggregator(settings, pool_config));
        let state = AppState {
            aggregator,
            cache_available: Arc::new(|| true),
        };

        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            state,
            start_time: std::time::Instant::now(),
        })
    }
}

#[async_trait]
impl FreightService for ScheduleAggregatorService {
    fn service_id(&self) -> &'static str {
        "schedule-aggregator"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let cache_available = (self.state.cache_available)();
        ReadinessStatus {
            ready: cache_available,
            dependencies: vec![DependencyStatus {
                name: "response-cache".to_string(),
                available: cache_available,
                latency_ms: None,
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Schedule Aggregator Service");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(bind = %self.http_bind, "binding HTTP listener");

        let router = create_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(&self.http_bind).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
