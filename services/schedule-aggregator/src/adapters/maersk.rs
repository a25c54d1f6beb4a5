//! Maersk-family streaming adapter.
//!
//! Covers MAEU, SEAU, SEJJ, MCPU and MAEI: one upstream streams its response
//! as newline-delimited JSON rather than a single document, so this adapter
//! drives [`HttpClientFacade::parse_stream`] and folds the stream into
//! schedules as records arrive instead of buffering a whole body first.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use freight_cache::CacheClient;
use freight_core::{Cutoff, Leg, PointBase, Schedule, Service, Transportation, Voyage};
use futures_util::StreamExt;
use reqwest::Method;
use serde_json::Value;

use super::{map_transport_type, passes_filters, CarrierAdapter};
use crate::http_client::HttpClientFacade;
use crate::request::ScheduleSearchRequest;
use crate::settings::Settings;

pub struct MaerskAdapter {
    scac: &'static str,
}

impl MaerskAdapter {
    pub fn new(scac: &'static str) -> Self {
        Self { scac }
    }
}

#[async_trait]
impl CarrierAdapter for MaerskAdapter {
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

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", settings.maersk.token.reveal()).parse()?,
        );

        let mut params = HashMap::new();
        params.insert("collectionOrigin".to_string(), request.origin.as_str().to_string());
        params.insert("collectionDestination".to_string(), request.destination.as_str().to_string());
        params.insert("startDate".to_string(), request.from_date().to_string());
        params.insert("endDate".to_string(), request.to_date().to_string());
        params.insert("carrierCodes".to_string(), self.scac.to_string());

        let mut stream = client
            .parse_stream(Method::GET, &settings.maersk.url, Some(&params), Some(headers))
            .await?;

        let mut schedules = Vec::new();
        while let Some(record) = stream.next().await {
            if let Some(schedule) = process_record(&record, self.scac) {
                if passes_filters(&schedule, &request.filters) {
                    schedules.push(schedule);
                }
            }
        }

        Ok(schedules)
    }
}

/// Each streamed NDJSON record is one complete route: unlike CMA's paged
/// document or HMM's outbound/main/inbound grouping, Maersk's upstream has
/// already assembled the full leg chain per
/// record before it's written to the wire.
fn process_record(record: &Value, scac: &str) -> Option<Schedule> {
    let raw_legs = record.get("transportLegs")?.as_array()?;
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
        location_name: raw.get("facilityDeparture")?.get("locationName")?.as_str()?.to_string(),
        location_code: raw.get("facilityDeparture")?.get("UNLocationCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("facilityDeparture")
            .and_then(|p| p.get("facilityName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: None,
    };
    let point_to = PointBase {
        location_name: raw.get("facilityArrival")?.get("locationName")?.as_str()?.to_string(),
        location_code: raw.get("facilityArrival")?.get("UNLocationCode")?.as_str()?.to_string(),
        terminal_name: raw
            .get("facilityArrival")
            .and_then(|p| p.get("facilityName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        terminal_code: None,
    };

    let etd: NaiveDateTime = raw.get("departureDateTime")?.as_str()?.parse().ok()?;
    let eta: NaiveDateTime = raw.get("arrivalDateTime")?.as_str()?.parse().ok()?;
    let transit_time = (eta - etd).num_hours() / 24;

    let raw_transport = raw.get("transportMode").and_then(Value::as_str).unwrap_or("");
    let transport_type = map_transport_type(raw_transport);
    let vessel_name = raw.get("vessel").and_then(|v| v.get("name")).and_then(Value::as_str);
    let imo = raw.get("vessel").and_then(|v| v.get("imoNumber")).and_then(Value::as_str);

    let transportations = Transportation {
        transport_type,
        transport_name: vessel_name.map(str::to_string),
        reference_type: imo.map(|_| "IMO".to_string()),
        reference: imo.map(str::to_string),
    };

    let services = raw
        .get("service")
        .and_then(|s| s.get("carrierServiceCode"))
        .and_then(Value::as_str)
        .map(|code| Service {
            service_code: code.to_string(),
        });

    let voyages = raw
        .get("transport")
        .and_then(|t| t.get("carrierVoyageNumber"))
        .and_then(Value::as_str)
        .map(|v| Voyage {
            internal_voyage: Some(v.to_string()),
            external_voyage: None,
        });

    let cutoffs = Cutoff::from_parts(None, None, None);

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
