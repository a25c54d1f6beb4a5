//! Generic token-auth adapter covering "Others | Token or OAuth | JSON".
//!
//! Covers the remaining carriers that share a plain bearer-token, single-
//! document JSON protocol with no paging or streaming wrinkle: MSCU, SUDU,
//! ANRM, OOLU, COSU, HLCU and ONEY. One struct parameterized by SCAC and
//! settings lookup stands in for what would otherwise be seven near-
//! identical adapter files.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use freight_cache::CacheClient;
use freight_core::{Cutoff, Leg, PointBase, Schedule, Service, Transportation, Voyage};
use reqwest::Method;
use serde_json::Value;

use super::{map_transport_type, passes_filters, CarrierAdapter};
use crate::http_client::{HttpClientFacade, ParseOutcome};
use crate::request::ScheduleSearchRequest;
use crate::settings::{CarrierTokenSettings, Settings};

pub struct GenericAdapter {
    scac: &'static str,
}

impl GenericAdapter {
    pub fn new(scac: &'static str) -> Self {
        Self { scac }
    }

    fn settings<'a>(&self, settings: &'a Settings) -> Option<&'a CarrierTokenSettings> {
        settings.generic.get(self.scac)
    }
}

#[async_trait]
impl CarrierAdapter for GenericAdapter {
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

        let Some(carrier_settings) = self.settings(settings) else {
            anyhow::bail!("no settings registered for generic carrier {}", self.scac);
        };

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", carrier_settings.token.reveal()).parse()?,
        );

        let mut params = HashMap::new();
        params.insert("origin".to_string(), request.origin.as_str().to_string());
        params.insert("destination".to_string(), request.destination.as_str().to_string());
        params.insert("fromDate".to_string(), request.from_date().to_string());
        params.insert("toDate".to_string(), request.to_date().to_string());

        let outcome = client
            .parse(
                Method::GET,
                &carrier_settings.url,
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
            ParseOutcome::Partial(partial) => partial.body,
            ParseOutcome::Empty => return Ok(Vec::new()),
        };

        let routes = document
            .get("routes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(routes
            .iter()
            .filter_map(|route| process_route(route, self.scac))
            .filter(|schedule| passes_filters(schedule, &request.filters))
            .collect())
    }
}

fn process_route(route: &Value, scac: &str) -> Option<Schedule> {
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
        scac: scac.to_string(),
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
        location_name: raw.get("pointFrom")?.get("locationName")?.as_str()?.to_string(),
        location_code: raw.get("pointFrom")?.get("locationCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("pointFrom")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: raw
            .get("pointFrom")
            .and_then(|p| p.get("terminalCode"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    let point_to = PointBase {
        location_name: raw.get("pointTo")?.get("locationName")?.as_str()?.to_string(),
        location_code: raw.get("pointTo")?.get("locationCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("pointTo")
            .and_then(|p| p.get("terminalName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: raw
            .get("pointTo")
            .and_then(|p| p.get("terminalCode"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    let etd: NaiveDateTime = raw.get("etd")?.as_str()?.parse().ok()?;
    let eta: NaiveDateTime = raw.get("eta")?.as_str()?.parse().ok()?;
    let transit_time = (eta - etd).num_hours() / 24;

    let raw_transport = raw.get("transportType").and_then(Value::as_str).unwrap_or("");
    let transport_type = map_transport_type(raw_transport);
    let vessel_name = raw.get("transportName").and_then(Value::as_str);
    let imo = raw.get("imo").and_then(Value::as_str);

    let transportations = Transportation {
        transport_type,
        transport_name: vessel_name.map(str::to_string),
        reference_type: imo.map(|_| "IMO".to_string()),
        reference: imo.map(str::to_string),
    };

    let services = raw.get("serviceCode").and_then(Value::as_str).map(|code| Service {
        service_code: code.to_string(),
    });

    let voyages = raw.get("voyage").and_then(Value::as_str).map(|v| Voyage {
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
