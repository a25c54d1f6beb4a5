//! CMA carrier-group adapter.
//!
//! Covers CMDU, ANNU, APLU, CHNL and CSFU: one underlying API distinguished
//! by a `carrierCode` query parameter. The API pages its response with HTTP
//! 206 and a `Content-Range: items N-M/TOTAL` header; when `TOTAL` exceeds
//! what the first page returned, follow-up pages are requested concurrently
//! with a `Range: N-N+49` header (not query-param paging) for `N` in
//! `{50, 100, ...}` below `TOTAL`, and the `X-Shipping-Company-Routings`
//! response header decides whether those follow-ups stay scoped to one
//! carrier or drop the filter, before the route list is normalized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use freight_cache::CacheClient;
use freight_core::{Cutoff, Leg, PointBase, Schedule, Service, Transportation, Voyage};
use reqwest::Method;
use serde_json::Value;
use tracing::warn;

use super::{map_transport_type, passes_filters, CarrierAdapter};
use crate::http_client::{HttpClientFacade, ParseOutcome, PartialResponse};
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;

/// CMA's `carrierCode` enumeration, mirroring the four codes the original
/// registered plus CSFU sharing the same protocol family.
const CARRIER_CODE_MAP: &[(&str, &str)] = &[
    ("CMDU", "0001"),
    ("ANNU", "0002"),
    ("CHNL", "0011"),
    ("APLU", "0015"),
    ("CSFU", "0001"),
];

/// Page size requested per call; CMA returns up to this many items per
/// `Content-Range` slice.
const PAGE_SIZE: u64 = 50;

pub struct CmaAdapter {
    scac: &'static str,
}

impl CmaAdapter {
    pub fn new(scac: &'static str) -> Self {
        Self { scac }
    }

    fn carrier_code(&self) -> &'static str {
        CARRIER_CODE_MAP
            .iter()
            .find(|(scac, _)| *scac == self.scac)
            .map(|(_, code)| *code)
            .unwrap_or("0001")
    }
}

/// `USGovernment` cargo is APLU (`0015`) moving between two US UN/LOCODEs;
/// everything else is `Commercial`.
fn specific_routings(carrier_code: &str, request: &ScheduleSearchRequest) -> &'static str {
    let us_to_us = request.origin.as_str().starts_with("US") && request.destination.as_str().starts_with("US");
    if carrier_code == "0015" && us_to_us {
        "USGovernment"
    } else {
        "Commercial"
    }
}

#[async_trait]
impl CarrierAdapter for CmaAdapter {
    fn scac(&self) -> &'static str {
        self.scac
    }

    async fn fetch(
        &self,
        client: &HttpClientFacade,
        _cache: &Arc<dyn CacheClient>,
        settings: &Settings,
        request: &ScheduleSearchRequest,
    ) -> anyhow::Result<Vec<Schedule>> {
        if let Some(carrier) = &request.filters.carrier_scac {
            if carrier.as_str() != self.scac {
                return Ok(Vec::new());
            }
        }

        // A US-to-US move is government cargo routed through APLU
        // regardless of which CMA-group carrier was requested, carried
        // over from the original's explicit origin/destination country
        // check.
        let carrier_code = if request.origin.as_str().starts_with("US") && request.destination.as_str().starts_with("US") {
            "0015"
        } else {
            self.carrier_code()
        };

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", settings.cma.token.reveal()).parse()?,
        );

        let base_params = |carrier_code: Option<&str>| -> HashMap<String, String> {
            let mut params = HashMap::new();
            params.insert("placeOfLoading".to_string(), request.origin.as_str().to_string());
            params.insert("placeOfDischarge".to_string(), request.destination.as_str().to_string());
            params.insert("startDate".to_string(), request.from_date().to_string());
            if let Some(code) = carrier_code {
                params.insert("carrierCode".to_string(), code.to_string());
            }
            let routing = carrier_code.map(|code| specific_routings(code, request)).unwrap_or("Commercial");
            params.insert("specificRoutings".to_string(), routing.to_string());
            params
        };

        let first = client
            .parse(
                Method::GET,
                &settings.cma.url,
                Some(&base_params(Some(carrier_code))),
                Some(headers.clone()),
                None,
                None,
                None,
                None,
            )
            .await?;

        let mut documents = Vec::new();
        match first {
            ParseOutcome::Document(body) => documents.push(body),
            ParseOutcome::Empty => return Ok(Vec::new()),
            ParseOutcome::Partial(partial) => {
                let Some((_, _, total)) = partial.content_range() else {
                    warn!("CMA 206 response missing a parseable Content-Range header");
                    documents.push(partial.body);
                    return Ok(normalize_all(&documents, request));
                };

                // The API names every carrier actually contributing to this
                // page in X-Shipping-Company-Routings. A single name means
                // follow-up pages can stay scoped to that carrier; multiple
                // names mean the page is already blended across carriers, so
                // follow-ups drop the carrier filter and fall back to the
                // default routing.
                let follow_up_carrier_code: Option<String> = match partial.shipping_company_routings() {
                    Some(codes) if codes.len() == 1 => Some(codes[0].clone()),
                    Some(_) => None,
                    None => Some(carrier_code.to_string()),
                };

                documents.push(partial.body);

                let remaining_offsets: Vec<u64> = std::iter::successors(Some(PAGE_SIZE), |o| Some(o + PAGE_SIZE))
                    .take_while(|&o| o < total)
                    .collect();

                let follow_up = remaining_offsets.into_iter().map(|offset| {
                    let mut headers = headers.clone();
                    let params = base_params(follow_up_carrier_code.as_deref());
                    let range = format!("{offset}-{}", offset + PAGE_SIZE - 1);
                    async move {
                        let range_value: reqwest::header::HeaderValue = range.parse()?;
                        headers.insert("range", range_value);
                        let outcome = client
                            .parse(Method::GET, &settings.cma.url, Some(&params), Some(headers), None, None, None, None)
                            .await?;
                        Ok::<_, anyhow::Error>(outcome)
                    }
                });

                for outcome in futures_util::future::try_join_all(follow_up).await? {
                    match outcome {
                        ParseOutcome::Document(body) | ParseOutcome::Partial(PartialResponse { body, .. }) => {
                            documents.push(body);
                        }
                        ParseOutcome::Empty => {}
                    }
                }
            }
        }

        Ok(normalize_all(&documents, request))
    }
}

fn normalize_all(documents: &[Value], request: &ScheduleSearchRequest) -> Vec<Schedule> {
    documents
        .iter()
        .flat_map(|doc| doc.get("routings").and_then(Value::as_array).cloned().unwrap_or_default())
        .filter_map(|route| process_route(&route))
        .filter(|schedule| passes_filters(schedule, &request.filters))
        .collect()
}

fn process_route(route: &Value) -> Option<Schedule> {
    let raw_legs = route.get("legs")?.as_array()?;
    if raw_legs.is_empty() {
        return None;
    }

    let legs: Vec<Leg> = raw_legs.iter().filter_map(process_leg).collect();
    if legs.is_empty() {
        return None;
    }

    let first = legs.first()?;
    let last = legs.last()?;
    let transshipment = legs.len() > 1;
    let transit_time: i64 = legs.iter().map(|leg| leg.transit_time).sum();

    Some(Schedule {
        scac: route.get("carrierCode").and_then(Value::as_str).unwrap_or("CMDU").to_string(),
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
        location_name: raw.get("departure")?.get("portName")?.as_str()?.to_string(),
        location_code: raw.get("departure")?.get("portCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("departure")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: None,
    };
    let point_to = PointBase {
        location_name: raw.get("arrival")?.get("portName")?.as_str()?.to_string(),
        location_code: raw.get("arrival")?.get("portCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("arrival")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: None,
    };

    let etd: NaiveDateTime = raw.get("departure")?.get("date")?.as_str()?.parse().ok()?;
    let eta: NaiveDateTime = raw.get("arrival")?.get("date")?.as_str()?.parse().ok()?;
    let transit_time = (eta - etd).num_hours() / 24;

    let raw_transport = raw.get("conveyance").and_then(Value::as_str).unwrap_or("");
    let transport_type = map_transport_type(raw_transport);
    let vessel_name = raw.get("vesselName").and_then(Value::as_str);
    let imo = raw.get("vesselIMO").and_then(Value::as_str);

    let transportations = Transportation {
        transport_type,
        transport_name: vessel_name.map(str::to_string),
        reference_type: imo.map(|_| "IMO".to_string()),
        reference: imo.map(str::to_string),
    };

    let services = raw.get("serviceCode").and_then(Value::as_str).map(|code| Service {
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
