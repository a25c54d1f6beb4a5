//! Carrier adapters.
//!
//! Each adapter authenticates, calls its carrier's API, and normalizes the
//! response into [`freight_core::Schedule`]s behind the shared
//! [`CarrierAdapter`] trait, so the aggregator can hold
//! `Vec<Box<dyn CarrierAdapter>>` and dispatch without a manual match per
//! carrier.

pub mod cma;
pub mod generic;
pub mod hmm;
pub mod maersk;
pub mod zim;

use std::sync::Arc;

use async_trait::async_trait;
use freight_cache::CacheClient;
use freight_core::{Schedule, ScheduleFilters};

use crate::http_client::HttpClientFacade;
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;

/// One carrier's fetch-and-normalize operation. `cache` is the
/// same store the aggregator uses for product envelopes; adapters that hold
/// their own short-lived credentials (ZIM's OAuth2 access token) use it to
/// avoid re-authenticating on every request.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// The SCAC this adapter answers for (used for logging and the
    /// `carrier_scac` filter dispatch in the aggregator).
    fn scac(&self) -> &'static str;

    async fn fetch(
        &self,
        client: &HttpClientFacade,
        cache: &Arc<dyn CacheClient>,
        settings: &Settings,
        request: &ScheduleSearchRequest,
    ) -> anyhow::Result<Vec<Schedule>>;
}

/// Filters applied identically across every adapter.
///
/// `service`: keep iff some leg with a voyage carries the requested service
/// code. `vessel_imo`: keep iff some leg's IMO reference equals the filter.
/// `tsp`: keep iff transshipment and some non-first leg departs from the
/// TSP code. `direct_only`: `Some(true)` requires single-leg,
/// `Some(false)` requires multi-leg, `None` accepts either.
pub fn passes_filters(schedule: &Schedule, filters: &ScheduleFilters) -> bool {
    let transshipment = schedule.legs.len() > 1;

    if let Some(direct_only) = filters.direct_only {
        if direct_only != !transshipment {
            return false;
        }
    }

    if let Some(service) = &filters.service_code {
        let has_service = schedule
            .legs
            .iter()
            .any(|leg| leg.voyages.is_some() && leg.services.as_ref().map(|s| &s.service_code) == Some(service));
        if !has_service {
            return false;
        }
    }

    if let Some(imo) = &filters.vessel_imo {
        let has_imo = schedule.legs.iter().any(|leg| {
            leg.transportations.reference_type.as_deref() == Some("IMO")
                && leg.transportations.reference.as_deref() == Some(imo.as_str())
        });
        if !has_imo {
            return false;
        }
    }

    if let Some(tsp) = &filters.transshipment_port {
        let has_tsp = transshipment
            && schedule
                .legs
                .iter()
                .skip(1)
                .any(|leg| leg.point_from.location_code == tsp.as_str());
        if !has_tsp {
            return false;
        }
    }

    true
}

/// Map a carrier-specific transport string to the closed set
/// `{Vessel, Feeder, Truck, Barge, Rail}`, using ZIM's vocabulary as the
/// reference mapping.
pub fn map_transport_type(raw: &str) -> freight_core::TransportType {
    use freight_core::TransportType::*;
    match raw {
        "Land Trans" => Truck,
        "Feeder" => Feeder,
        "BAR" => Barge,
        "TO BE NAMED" => Vessel,
        _ => Vessel,
    }
}

/// ZIM's IMO-reference mapping rule. Other
/// carriers that report an unambiguous IMO skip this and use it directly;
/// this fallback ladder only applies when the upstream document is
/// ambiguous about which vessel operated the leg.
pub fn map_imo(
    leg_imo: Option<&str>,
    vessel_name: Option<&str>,
    line: Option<&str>,
    transport: freight_core::TransportType,
) -> String {
    use freight_core::TransportType::*;

    if let Some(imo) = leg_imo {
        if vessel_name != Some("TO BE NAMED") && !matches!(transport, Truck) {
            return imo.to_string();
        }
    }

    if (line == Some("UNK") && leg_imo.is_none() && !matches!(transport, Truck)) || matches!(transport, Feeder) {
        return "9".to_string();
    }

    if matches!(transport, Truck) {
        return "3".to_string();
    }

    "1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use freight_core::TransportType;

    #[test]
    fn imo_mapping_prefers_present_imo() {
        assert_eq!(
            map_imo(Some("1234567"), Some("EVER GIVEN"), Some("ZCA"), TransportType::Vessel),
            "1234567"
        );
    }

    #[test]
    fn imo_mapping_placeholder_nine_for_unk_line_no_imo() {
        assert_eq!(map_imo(None, Some("TO BE NAMED"), Some("UNK"), TransportType::Vessel), "9");
    }

    #[test]
    fn imo_mapping_placeholder_nine_for_feeder() {
        assert_eq!(map_imo(None, Some("FEEDER ONE"), Some("ZCA"), TransportType::Feeder), "9");
    }

    #[test]
    fn imo_mapping_present_imo_wins_even_for_feeder() {
        assert_eq!(
            map_imo(Some("7654321"), Some("FEEDER ONE"), Some("ZCA"), TransportType::Feeder),
            "7654321"
        );
    }

    #[test]
    fn imo_mapping_placeholder_three_for_truck() {
        assert_eq!(map_imo(None, None, None, TransportType::Truck), "3");
    }

    #[test]
    fn imo_mapping_placeholder_one_default() {
        assert_eq!(map_imo(None, Some("SOME VESSEL"), Some("ZCA"), TransportType::Vessel), "1");
    }

    #[test]
    fn transport_type_mapping_matches_zim_table() {
        assert!(matches!(map_transport_type("Land Trans"), TransportType::Truck));
        assert!(matches!(map_transport_type("Feeder"), TransportType::Feeder));
        assert!(matches!(map_transport_type("BAR"), TransportType::Barge));
        assert!(matches!(map_transport_type("TO BE NAMED"), TransportType::Vessel));
        assert!(matches!(map_transport_type("anything else"), TransportType::Vessel));
    }
}
