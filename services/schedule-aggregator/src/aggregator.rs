//! Aggregator and validator.
//!
//! Owns the nine-step pipeline: fingerprint the request, consult the cache,
//! fan the adapters out through the task manager, flatten, sort, validate,
//! serialize, and write the result back to the cache as a background task.
//! This is the only component that calls the task manager, and the only one
//! the HTTP surface talks to directly.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use freight_cache::{CacheClient, CacheClientExt};
use freight_core::{PoolConfig, ProductEnvelope, Schedule};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::CarrierAdapter;
use crate::http_client::HttpClientFacade;
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;
use crate::task_manager::{RetryPolicy, TaskManager};

/// Response headers the HTTP surface must emit verbatim.
pub struct AggregatorResponse {
    pub envelope: ProductEnvelope,
    pub correlation_id: Uuid,
    pub count_schedules: usize,
    pub cache_control: &'static str,
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn CarrierAdapter>>,
    http_client: Arc<HttpClientFacade>,
    cache: Arc<dyn CacheClient>,
    settings: Arc<Settings>,
    pool_config: PoolConfig,
}

/// Above this many flattened schedules, the sort/validate/serialize pass
/// moves off the async executor: JSON decoding and validation are
/// synchronous and must be kept off the I/O thread when payloads exceed
/// roughly 1 MB, and this count is a cheap proxy for that byte threshold.
const SPAWN_BLOCKING_THRESHOLD: usize = 256;

impl Aggregator {
    pub fn new(
        adapters: Vec<Arc<dyn CarrierAdapter>>,
        http_client: Arc<HttpClientFacade>,
        cache: Arc<dyn CacheClient>,
        settings: Arc<Settings>,
        pool_config: PoolConfig,
    ) -> Self {
        Self {
            adapters,
            http_client,
            cache,
            settings,
            pool_config,
        }
    }

    /// Canonical request string fingerprinted into the product UUID (the
    /// response fingerprint).
    fn product_cache_key(request: &ScheduleSearchRequest) -> Uuid {
        let params = [
            ("origin", request.origin.as_str().to_string()),
            ("destination", request.destination.as_str().to_string()),
            ("from", request.from_date().to_string()),
            ("to", request.to_date().to_string()),
        ];
        let filters = [
            (
                "carrier_scac",
                request.filters.carrier_scac.as_ref().map(|s| s.as_str().to_string()),
            ),
            ("vessel_imo", request.filters.vessel_imo.clone()),
            ("service_code", request.filters.service_code.clone()),
            (
                "tsp",
                request.filters.transshipment_port.as_ref().map(|s| s.as_str().to_string()),
            ),
            ("direct_only", request.filters.direct_only.map(|b| b.to_string())),
        ];
        freight_cache::fingerprint("product", &params, &filters)
    }

    pub async fn search(&self, request: ScheduleSearchRequest) -> AggregatorResponse {
        let correlation_id = Uuid::new_v4();
        let cache_key = Self::product_cache_key(&request);

        // Step 2: consult the cache before touching any upstream.
        if let Some(cached) = self.cache.get::<ProductEnvelope>(cache_key).await {
            info!(%cache_key, "product envelope cache hit");
            let count = cached.noof_schedule;
            return AggregatorResponse {
                envelope: cached,
                correlation_id,
                count_schedules: count,
                cache_control: "public, max-age=7200",
            };
        }

        // Steps 3-4: fan out one task per adapter, gather with partial-failure
        // tolerance, flatten non-exception/non-none results into one list.
        let mut manager: TaskManager<Vec<Schedule>> = TaskManager::new(RetryPolicy {
            base_timeout: Duration::from_secs(self.pool_config.async_default_timeout_secs),
            max_retries: self.pool_config.retry_number,
        });
        let error_flag = manager.error_flag();

        for adapter in &self.adapters {
            let adapter = adapter.clone();
            let client = self.http_client.clone();
            let cache = self.cache.clone();
            let settings = self.settings.clone();
            let request = request.clone();
            let scac = adapter.scac();

            manager.spawn(scac, move || {
                let adapter = adapter.clone();
                let client = client.clone();
                let cache = cache.clone();
                let settings = settings.clone();
                let request = request.clone();
                async move { adapter.fetch(&client, &cache, &settings, &request).await }
            });
        }

        let results = manager.join_all().await;
        let had_error = error_flag.load(Ordering::Relaxed);
        let mut schedules: Vec<Schedule> = TaskManager::successes(results).flatten().collect();

        // Steps 4-6: sort, validate, serialize. Offloaded to a worker thread
        // once the result set is large enough to matter.
        schedules = if schedules.len() > SPAWN_BLOCKING_THRESHOLD {
            match tokio::task::spawn_blocking(move || sort_and_validate(schedules)).await {
                Ok(validated) => validated,
                Err(e) => {
                    warn!(error = %e, "validation worker task panicked, treating result as empty");
                    Vec::new()
                }
            }
        } else {
            sort_and_validate(schedules)
        };

        let envelope = if schedules.is_empty() {
            ProductEnvelope::not_found(
                cache_key,
                request.origin.as_str().to_string(),
                request.destination.as_str().to_string(),
            )
        } else {
            ProductEnvelope::found(
                cache_key,
                request.origin.as_str().to_string(),
                request.destination.as_str().to_string(),
                schedules,
            )
        };

        let cache_control = if envelope.noof_schedule == 0 {
            "no-store"
        } else {
            "public, max-age=7200"
        };

        // Step 8: only cache a non-empty, error-free result.
        if envelope.noof_schedule > 0 && !had_error {
            let cache = self.cache.clone();
            let envelope_clone = envelope.clone();
            let expire = Duration::from_secs(self.pool_config.schedule_expiry_secs);
            tokio::spawn(async move {
                cache.set(cache_key, &envelope_clone, Some(expire)).await;
            });
        }

        AggregatorResponse {
            count_schedules: envelope.noof_schedule,
            envelope,
            correlation_id,
            cache_control,
        }
    }

}

/// Steps 4-6 of the aggregator pipeline: sort by `(etd, transitTime)`,
/// validate each schedule against I1-I7, drop the ones that fail (logging a
/// warning), leaving the rest ready to serialize.
fn sort_and_validate(mut schedules: Vec<Schedule>) -> Vec<Schedule> {
    schedules.sort_by(|a, b| (a.etd, a.transit_time).cmp(&(b.etd, b.transit_time)));

    schedules
        .into_iter()
        .filter(|schedule| match schedule.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!(scac = %schedule.scac, reason = %reason, "dropping schedule that failed validation");
                false
            }
        })
        .collect()
}
