//! ZIM adapter.
//!
//! ZIM authenticates with OAuth2 client-credentials against a dedicated
//! token endpoint, then calls its schedule search carrying the token and an
//! Azure APIM subscription key. Its legs arrive tagged with a `legOrder`
//! index that must be used to order (and, where the upstream omits an
//! index, drop) the route before it can be normalized.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use freight_cache::{CacheClient, CacheClientExt};
use freight_core::{Cutoff, Leg, PointBase, Schedule, Service, Transportation, TransportType, Voyage};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{map_imo, map_transport_type, passes_filters};
use crate::http_client::{HttpClientFacade, ParseOutcome};
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;

use super::CarrierAdapter;

const SCAC: &str = "ZIMU";

/// ZIM's raw `transportType` strings and the closed set they map to.
/// Anything not listed here is assumed to be a vessel leg.
fn zim_transport_type(raw: &str) -> TransportType {
    map_transport_type(raw)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct ZimAdapter;

impl ZimAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn access_token(
        &self,
        client: &HttpClientFacade,
        cache: &Arc<dyn CacheClient>,
        settings: &Settings,
    ) -> anyhow::Result<String> {
        let cache_key = freight_cache::fingerprint("zim_oauth_token", &[], &[]);
        if let Some(token) = cache.get::<String>(cache_key).await {
            return Ok(token);
        }

        let mut form = std::collections::HashMap::new();
        form.insert("grant_type".to_string(), "client_credentials".to_string());
        form.insert("client_id".to_string(), settings.zim.client_id.reveal().to_string());
        form.insert("client_secret".to_string(), settings.zim.client_secret.reveal().to_string());

        let outcome = client
            .parse(
                Method::POST,
                &settings.zim.token_url,
                None,
                None,
                None,
                Some(&form),
                None,
                None,
            )
            .await?;

        let document = match outcome {
            ParseOutcome::Document(body) => body,
            _ => anyhow::bail!("ZIM token endpoint returned no usable body"),
        };

        let token: TokenResponse = serde_json::from_value(document)?;
        // The token endpoint issues 60-minute tokens; cache for 55 to leave
        // margin for clock skew and in-flight requests.
        let ttl = Duration::from_secs(token.expires_in.unwrap_or(3600).min(3300));
        cache.set(cache_key, &token.access_token, Some(ttl)).await;

        Ok(token.access_token)
    }
}

#[async_trait]
impl CarrierAdapter for ZimAdapter {
    fn scac(&self) -> &'static str {
        SCAC
    }

    async fn fetch(
        &self,
        client: &HttpClientFacade,
        cache: &Arc<dyn CacheClient>,
        settings: &Settings,
        request: &ScheduleSearchRequest,
    ) -> anyhow::Result<Vec<Schedule>> {
        if let Some(carrier) = &request.filters.carrier_scac {
            if carrier.as_str() != SCAC {
                return Ok(Vec::new());
            }
        }

        let token = self.access_token(client, cache, settings).await?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {token}").parse()?,
        );
        headers.insert(
            "Ocp-Apim-Subscription-Key",
            settings.zim.subscription_key.reveal().parse()?,
        );

        let mut params = std::collections::HashMap::new();
        params.insert("originCode".to_string(), request.origin.as_str().to_string());
        params.insert("destinationCode".to_string(), request.destination.as_str().to_string());
        params.insert("fromDate".to_string(), request.from_date().to_string());
        params.insert("toDate".to_string(), request.to_date().to_string());

        let outcome = client
            .parse(
                Method::GET,
                &settings.zim.url,
                Some(&params),
                Some(headers),
                None,
                None,
                None,
                None,
            )
            .await?;

        let document = match outcome {
            ParseOutcome::Document(body) => body,
            ParseOutcome::Partial(_) => anyhow::bail!("ZIM does not page, got an unexpected 206"),
            ParseOutcome::Empty => return Ok(Vec::new()),
        };

        let routes = document
            .get("routes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let schedules: Vec<Schedule> = routes
            .iter()
            .filter_map(|route| process_route(route))
            .filter(|schedule| passes_filters(schedule, &request.filters))
            .collect();

        Ok(schedules)
    }
}

fn leg_from_code(leg: &Value) -> Option<&str> {
    leg.get("fromPoint")?.get("code")?.as_str()
}

/// Normalize one ZIM route document into a [`Schedule`].
///
/// Legs missing `legOrder` are dropped, the rest sorted by it, and then the
/// route is clipped to its nearest point-of-loading leg: ZIM sometimes
/// prefixes a route with repositioning legs that depart from the same port
/// the route ultimately sails from again later, and only that later
/// departure is the real start of transit. The nearest POL leg is the one
/// with the highest `legOrder` among those departing from the route's point
/// of loading; legs ordered before it are dropped. A route whose POL never
/// matches any leg's origin is dropped entirely rather than guessed at.
fn process_route(route: &Value) -> Option<Schedule> {
    let raw_legs = route.get("legs")?.as_array()?;

    let mut ordered: Vec<(i64, &Value)> = raw_legs
        .iter()
        .filter_map(|leg| {
            let order = leg.get("legOrder")?.as_i64()?;
            Some((order, leg))
        })
        .collect();

    if ordered.len() != raw_legs.len() {
        warn!(
            dropped = raw_legs.len() - ordered.len(),
            "ZIM route had legs without legOrder, dropping them"
        );
    }
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by_key(|(order, _)| *order);

    let point_of_loading = route
        .get("departurePort")
        .and_then(Value::as_str)
        .or_else(|| ordered.first().and_then(|(_, leg)| leg_from_code(leg)))?;

    let nearest_pol_order = ordered
        .iter()
        .rev()
        .find(|(_, leg)| leg_from_code(leg) == Some(point_of_loading))
        .map(|(order, _)| *order);

    let Some(nearest_pol_order) = nearest_pol_order else {
        warn!(%point_of_loading, "ZIM route had no leg departing from its point of loading, dropping route");
        return None;
    };

    let transshipment = ordered.len() > 1;

    let legs: Vec<Leg> = ordered
        .iter()
        .filter(|(order, _)| *order >= nearest_pol_order)
        .filter_map(|(_, raw)| process_leg(raw))
        .collect();
    if legs.is_empty() {
        return None;
    }

    let first = legs.first()?;
    let last = legs.last()?;
    let transit_time: i64 = legs.iter().map(|leg| leg.transit_time).sum();

    Some(Schedule {
        scac: SCAC.to_string(),
        point_from: first.point_from.location_code.clone(),
        point_to: last.point_to.location_code.clone(),
        etd: first.etd,
        eta: last.eta,
        transit_time,
        transshipment,
        legs,
    })
}

fn process_leg(raw: &Value) -> Option<Leg> {
    let point_from = PointBase {
        location_name: raw.get("fromPoint")?.get("name")?.as_str()?.to_string(),
        location_code: raw.get("fromPoint")?.get("code")?.as_str()?.to_string(),
        terminal_name: raw
            .get("fromPoint")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: raw
            .get("fromPoint")
            .and_then(|p| p.get("terminalCode"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    let point_to = PointBase {
        location_name: raw.get("toPoint")?.get("name")?.as_str()?.to_string(),
        location_code: raw.get("toPoint")?.get("code")?.as_str()?.to_string(),
        terminal_name: raw
            .get("toPoint")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: raw
            .get("toPoint")
            .and_then(|p| p.get("terminalCode"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    let etd: NaiveDateTime = raw.get("etd")?.as_str()?.parse().ok()?;
    let eta: NaiveDateTime = raw.get("eta")?.as_str()?.parse().ok()?;
    let transit_time = (eta - etd).num_hours() / 24;

    let raw_transport = raw.get("transportType").and_then(Value::as_str).unwrap_or("");
    let transport_type = zim_transport_type(raw_transport);
    let vessel_name = raw.get("vesselName").and_then(Value::as_str);
    let line = raw.get("line").and_then(Value::as_str);
    let leg_imo = raw.get("imo").and_then(Value::as_str);

    let reference = map_imo(leg_imo, vessel_name, line, transport_type);

    let transportations = Transportation {
        transport_type,
        transport_name: vessel_name.map(str::to_string),
        reference_type: Some("IMO".to_string()),
        reference: Some(reference),
    };

    let services = raw
        .get("serviceCode")
        .and_then(Value::as_str)
        .map(|code| Service {
            service_code: code.to_string(),
        });

    let voyages = raw.get("voyageNumber").and_then(Value::as_str).map(|v| Voyage {
        internal_voyage: Some(v.to_string()),
        external_voyage: None,
    });

    let cutoffs = Cutoff::from_parts(
        raw.get("cyCutoffDate").and_then(Value::as_str).and_then(|s| s.parse().ok()),
        raw.get("docCutoffDate").and_then(Value::as_str).and_then(|s| s.parse().ok()),
        raw.get("vgmCutoffDate").and_then(Value::as_str).and_then(|s| s.parse().ok()),
    );

    Some(Leg {
        point_from,
        point_to,
        etd,
        eta,
        transit_time,
        transportations,
        services,
        voyages,
        cutoffs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_with_unordered_legs_is_sorted_before_chaining() {
        let route = json!({
            "legs": [
                {
                    "legOrder": 2,
                    "fromPoint": {"name": "Singapore", "code": "SGSIN"},
                    "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                    "etd": "2026-02-01T00:00:00",
                    "eta": "2026-02-15T00:00:00",
                    "transportType": "TO BE NAMED",
                    "vesselName": "EVER GIVEN",
                    "line": "ZCA",
                    "imo": "1234567",
                },
                {
                    "legOrder": 1,
                    "fromPoint": {"name": "Shanghai", "code": "CNSHA"},
                    "toPoint": {"name": "Singapore", "code": "SGSIN"},
                    "etd": "2026-01-01T00:00:00",
                    "eta": "2026-01-10T00:00:00",
                    "transportType": "Feeder",
                    "vesselName": "FEEDER ONE",
                    "line": "ZCA",
                },
            ]
        });

        let schedule = process_route(&route).expect("route normalizes");
        assert_eq!(schedule.point_from, "CNSHA");
        assert_eq!(schedule.point_to, "USLAX");
        assert!(schedule.transshipment);
        assert_eq!(schedule.legs[0].point_to.location_code, "SGSIN");
        assert_eq!(schedule.legs[1].point_from.location_code, "SGSIN");
        assert_eq!(schedule.legs[0].transportations.reference.as_deref(), Some("9"));
    }

    #[test]
    fn route_with_no_ordered_legs_is_dropped() {
        let route = json!({
            "legs": [
                {
                    "fromPoint": {"name": "Singapore", "code": "SGSIN"},
                    "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                    "etd": "2026-02-01T00:00:00",
                    "eta": "2026-02-15T00:00:00",
                    "transportType": "TO BE NAMED",
                }
            ]
        });
        assert!(process_route(&route).is_none());
    }

    #[test]
    fn route_is_clipped_to_its_nearest_point_of_loading_leg() {
        let route = json!({
            "legs": [
                {
                    "legOrder": 1,
                    "fromPoint": {"name": "Hong Kong", "code": "HKHKG"},
                    "toPoint": {"name": "Shanghai", "code": "CNSHA"},
                    "etd": "2025-12-20T00:00:00",
                    "eta": "2025-12-22T00:00:00",
                    "transportType": "Feeder",
                    "vesselName": "FEEDER ONE",
                    "line": "ZCA",
                },
                {
                    "legOrder": 2,
                    "fromPoint": {"name": "Hong Kong", "code": "HKHKG"},
                    "toPoint": {"name": "Singapore", "code": "SGSIN"},
                    "etd": "2026-01-01T00:00:00",
                    "eta": "2026-01-10T00:00:00",
                    "transportType": "TO BE NAMED",
                    "vesselName": "EVER GIVEN",
                    "line": "ZCA",
                    "imo": "1234567",
                },
                {
                    "legOrder": 3,
                    "fromPoint": {"name": "Singapore", "code": "SGSIN"},
                    "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                    "etd": "2026-01-10T00:00:00",
                    "eta": "2026-01-25T00:00:00",
                    "transportType": "TO BE NAMED",
                    "vesselName": "EVER GIVEN",
                    "line": "ZCA",
                    "imo": "1234567",
                },
            ]
        });

        let schedule = process_route(&route).expect("route normalizes");
        // The positioning leg out of HKHKG at legOrder 1 is clipped because
        // the route departs HKHKG again at legOrder 2, which is nearer to
        // the actual point of loading.
        assert_eq!(schedule.legs.len(), 2);
        assert_eq!(schedule.point_from, "HKHKG");
        assert_eq!(schedule.point_to, "USLAX");
        // Raw leg count still reflects a route with repositioning involved.
        assert!(schedule.transshipment);
    }

    #[test]
    fn route_with_unresolvable_point_of_loading_is_dropped() {
        let route = json!({
            "departurePort": "NLRTM",
            "legs": [
                {
                    "legOrder": 1,
                    "fromPoint": {"name": "Hong Kong", "code": "HKHKG"},
                    "toPoint": {"name": "Singapore", "code": "SGSIN"},
                    "etd": "2026-01-01T00:00:00",
                    "eta": "2026-01-10T00:00:00",
                    "transportType": "TO BE NAMED",
                    "vesselName": "EVER GIVEN",
                    "line": "ZCA",
                    "imo": "1234567",
                },
            ]
        });
        assert!(process_route(&route).is_none());
    }
}
