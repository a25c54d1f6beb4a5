//! HMM adapter.
//!
//! HMM authenticates with a static gateway API key and returns one document
//! per route split into outbound/main/inbound leg groups rather than a flat
//! leg array. Responses are cached under a UUIDv5 fingerprint of the search
//! parameters so a repeated identical search within the TTL window never
//! reaches the upstream a second time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use freight_cache::{CacheClient, CacheClientExt};
use freight_core::{Cutoff, Leg, PointBase, Schedule, Service, Transportation, Voyage};
use reqwest::Method;
use serde_json::Value;

use super::{map_transport_type, passes_filters, CarrierAdapter};
use crate::http_client::{HttpClientFacade, ParseOutcome};
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;

const SCAC: &str = "HDMU";
const CACHE_TTL: Duration = Duration::from_secs(7200);

pub struct HmmAdapter;

impl HmmAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CarrierAdapter for HmmAdapter {
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

        let cache_key = freight_cache::fingerprint(
            "hmm",
            &[
                ("origin", request.origin.as_str().to_string()),
                ("destination", request.destination.as_str().to_string()),
                ("from", request.from_date().to_string()),
                ("to", request.to_date().to_string()),
            ],
            &[],
        );

        if let Some(cached) = cache.get::<Value>(cache_key).await {
            return Ok(normalize(&cached, request));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-Gateway-APIKey", settings.hmm.token.reveal().parse()?);

        let mut params = HashMap::new();
        params.insert("porCtrCd".to_string(), country_code(request.origin.as_str()));
        params.insert("polCd".to_string(), request.origin.as_str().to_string());
        params.insert("podCd".to_string(), request.destination.as_str().to_string());
        params.insert("dlyCtrCd".to_string(), country_code(request.destination.as_str()));
        params.insert("searchDt".to_string(), request.from_date().to_string());

        let outcome = client
            .parse(
                Method::GET,
                &settings.hmm.url,
                Some(&params),
                Some(headers),
                None,
                None,
                Some(cache_key),
                Some(CACHE_TTL),
            )
            .await?;

        let document = match outcome {
            ParseOutcome::Document(body) => body,
            ParseOutcome::Partial(partial) => partial.body,
            ParseOutcome::Empty => return Ok(Vec::new()),
        };

        Ok(normalize(&document, request))
    }
}

fn country_code(un_locode: &str) -> String {
    un_locode.chars().take(2).collect()
}

fn normalize(document: &Value, request: &ScheduleSearchRequest) -> Vec<Schedule> {
    document
        .get("schedules")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(process_schedule)
        .filter(|schedule| passes_filters(schedule, &request.filters))
        .collect()
}

/// HMM splits a route into `outbound`/`main`/`inbound` leg groups rather
/// than a flat array; they're concatenated in that order to form one chain,
/// with `webPriority` distinguishing a direct ("D") sailing — which has only
/// a `main` group — from a transshipment ("T") one with all three groups.
/// "A" (additional) groups, when present, are appended after `inbound`.
fn process_schedule(raw: &Value) -> Option<Schedule> {
    let mut raw_legs: Vec<&Value> = Vec::new();
    for group in ["outbound", "main", "inbound", "additional"] {
        if let Some(array) = raw.get(group).and_then(Value::as_array) {
            raw_legs.extend(array.iter());
        }
    }
    if raw_legs.is_empty() {
        return None;
    }

    let legs: Vec<Leg> = raw_legs.iter().filter_map(|leg| process_leg(leg)).collect();
    if legs.is_empty() {
        return None;
    }

    let first = legs.first()?;
    let last = legs.last()?;
    let transshipment = legs.len() > 1;
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
        location_name: raw.get("polName")?.as_str()?.to_string(),
        location_code: raw.get("polCd")?.as_str()?.to_string(),
        terminal_name: raw.get("polTrmlName").and_then(Value::as_str).map(str::to_string),
        terminal_code: None,
    };
    let point_to = PointBase {
        location_name: raw.get("podName")?.as_str()?.to_string(),
        location_code: raw.get("podCd")?.as_str()?.to_string(),
        terminal_name: raw.get("podTrmlName").and_then(Value::as_str).map(str::to_string),
        terminal_code: None,
    };

    let etd: NaiveDateTime = raw.get("etd")?.as_str()?.parse().ok()?;
    let eta: NaiveDateTime = raw.get("eta")?.as_str()?.parse().ok()?;
    let transit_time = (eta - etd).num_hours() / 24;

    let raw_transport = raw.get("vslTypCd").and_then(Value::as_str).unwrap_or("");
    let transport_type = map_transport_type(raw_transport);
    let vessel_name = raw.get("vslNm").and_then(Value::as_str);
    let imo = raw.get("vslImo").and_then(Value::as_str);

    let transportations = Transportation {
        transport_type,
        transport_name: vessel_name.map(str::to_string),
        reference_type: imo.map(|_| "IMO".to_string()),
        reference: imo.map(str::to_string),
    };

    let services = raw.get("svcCd").and_then(Value::as_str).map(|code| Service {
        service_code: code.to_string(),
    });

    let voyages = raw.get("voyNo").and_then(Value::as_str).map(|v| Voyage {
        internal_voyage: Some(v.to_string()),
        external_voyage: None,
    });

    let cutoffs = Cutoff::from_parts(
        raw.get("cyCutoffDt").and_then(Value::as_str).and_then(|s| s.parse().ok()),
        raw.get("docCutoffDt").and_then(Value::as_str).and_then(|s| s.parse().ok()),
        raw.get("vgmCutoffDt").and_then(Value::as_str).and_then(|s| s.parse().ok()),
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
