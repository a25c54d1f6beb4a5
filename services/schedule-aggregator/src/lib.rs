//! Schedule Aggregator
//!
//! P2P ocean-freight schedule aggregator: concurrently queries independent
//! container-carrier schedule APIs, normalizes each carrier's response into
//! a shared schedule model, merges the results, and returns a sorted,
//! validated, de-duplicated list of sailings.
//!
//! - [`settings`]: process-wide carrier credential/URL registry
//! - [`http_client`]: shared pooled HTTP client facade
//! - [`task_manager`]: per-carrier timeout/retry fan-out
//! - [`adapters`]: one normalization adapter per carrier protocol family
//! - [`aggregator`]: fingerprint, cache, flatten, sort, validate, serialize
//! - [`http_api`]: the `axum` surface binding the above to the network

pub mod adapters;
pub mod aggregator;
pub mod error;
pub mod http_api;
pub mod http_client;
pub mod request;
pub mod settings;
pub mod task_manager;

use std::sync::Arc;

use freight_cache::{CacheClient, InMemoryCacheClient};
use freight_core::PoolConfig;

use adapters::cma::CmaAdapter;
use adapters::generic::GenericAdapter;
use adapters::hmm::HmmAdapter;
use adapters::maersk::MaerskAdapter;
use adapters::zim::ZimAdapter;
use adapters::CarrierAdapter;
use settings::{CMA_GROUP_SCACS, GENERIC_CARRIER_SCACS, MAERSK_GROUP_SCACS};

/// Build the full roster of carrier adapters, one per supported SCAC: the
/// three concrete protocol families (ZIM, CMA, HMM) plus the Maersk
/// streaming family and the generic token-auth family covering the rest.
pub fn carrier_adapters() -> Vec<Arc<dyn CarrierAdapter>> {
    let mut adapters: Vec<Arc<dyn CarrierAdapter>> = vec![
        Arc::new(ZimAdapter::new()),
        Arc::new(HmmAdapter::new()),
    ];

    for scac in CMA_GROUP_SCACS {
        adapters.push(Arc::new(CmaAdapter::new(scac)));
    }
    for scac in MAERSK_GROUP_SCACS {
        adapters.push(Arc::new(MaerskAdapter::new(scac)));
    }
    for scac in GENERIC_CARRIER_SCACS {
        adapters.push(Arc::new(GenericAdapter::new(scac)));
    }

    adapters
}

/// Build an [`aggregator::Aggregator`] with the in-process reference cache,
/// suitable for local runs and as the building block the binary's `main`
/// wires to a real HTTP listener. A production deployment would substitute
/// `InMemoryCacheClient` with a real external KV store implementing
/// [`CacheClient`]; the aggregator itself does not change.
pub fn build_aggregator(
    settings: Arc<settings::Settings>,
    pool_config: PoolConfig,
) -> aggregator::Aggregator {
    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = Arc::new(http_client::HttpClientFacade::new(&pool_config, cache.clone()));
    aggregator::Aggregator::new(carrier_adapters(), http_client, cache, settings, pool_config)
}
