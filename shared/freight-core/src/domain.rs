//! Unified schedule domain types shared by the aggregator and every carrier adapter.
//!
//! These are the wire types returned to callers, plus the small newtypes
//! that resolve representation choices at the request boundary: UN/LOCODEs
//! and SCACs are validated instead of carried as bare `String`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{FreightError, Result};

/// A UN/LOCODE: a 5-character location code (e.g. `USNYC`, `SGSIN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnLocode(String);

impl UnLocode {
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() == 5 && value.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(value.to_ascii_uppercase()))
        } else {
            Err(FreightError::InvalidRequest(format!(
                "'{value}' is not a 5-character UN/LOCODE"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnLocode {
    type Error = FreightError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<UnLocode> for String {
    fn from(value: UnLocode) -> Self {
        value.0
    }
}

impl fmt::Display for UnLocode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standard Carrier Alpha Code: a 4-letter carrier identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scac(String);

impl Scac {
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() == 4 && value.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(value.to_ascii_uppercase()))
        } else {
            Err(FreightError::InvalidRequest(format!(
                "'{value}' is not a 4-letter SCAC"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Scac {
    type Error = FreightError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Scac> for String {
    fn from(value: Scac) -> Self {
        value.0
    }
}

impl fmt::Display for Scac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Departure` or `Arrival` — which date field the caller supplied, used
/// to construct the search date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartDateType {
    Departure,
    Arrival,
}

/// The four accepted search windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchRange {
    #[serde(rename = "1")]
    SevenDays,
    #[serde(rename = "2")]
    FourteenDays,
    #[serde(rename = "3")]
    TwentyOneDays,
    #[serde(rename = "4")]
    TwentyEightDays,
}

impl SearchRange {
    pub fn duration_days(self) -> i64 {
        match self {
            Self::SevenDays => 7,
            Self::FourteenDays => 14,
            Self::TwentyOneDays => 21,
            Self::TwentyEightDays => 28,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::SevenDays),
            2 => Ok(Self::FourteenDays),
            3 => Ok(Self::TwentyOneDays),
            4 => Ok(Self::TwentyEightDays),
            other => Err(FreightError::InvalidRequest(format!(
                "search_range must be one of {{1,2,3,4}}, got {other}"
            ))),
        }
    }
}

/// The closed set of transport modes every carrier-specific string is
/// mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportType {
    Vessel,
    Feeder,
    Truck,
    Barge,
    Rail,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vessel => "Vessel",
            Self::Feeder => "Feeder",
            Self::Truck => "Truck",
            Self::Barge => "Barge",
            Self::Rail => "Rail",
        };
        f.write_str(s)
    }
}

/// Tri-state direct-only filter: `true`/`false`/unset.
pub type DirectOnly = Option<bool>;

/// Filters accepted identically across every adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilters {
    pub carrier_scac: Option<Scac>,
    pub vessel_imo: Option<String>,
    pub service_code: Option<String>,
    pub transshipment_port: Option<UnLocode>,
    pub direct_only: DirectOnly,
}

/// One leg's endpoint: a location plus optional terminal detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointBase {
    #[serde(rename = "locationName")]
    pub location_name: String,
    #[serde(rename = "locationCode")]
    pub location_code: String,
    #[serde(rename = "terminalName", skip_serializing_if = "Option::is_none")]
    pub terminal_name: Option<String>,
    #[serde(rename = "terminalCode", skip_serializing_if = "Option::is_none")]
    pub terminal_code: Option<String>,
}

/// The carrier's reference identifier for the vehicle operating a leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transportation {
    #[serde(rename = "transportType")]
    pub transport_type: TransportType,
    #[serde(rename = "transportName", skip_serializing_if = "Option::is_none")]
    pub transport_name: Option<String>,
    #[serde(rename = "referenceType", skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "serviceCode")]
    pub service_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Voyage {
    #[serde(rename = "internalVoyage", skip_serializing_if = "Option::is_none")]
    pub internal_voyage: Option<String>,
    #[serde(rename = "externalVoyage", skip_serializing_if = "Option::is_none")]
    pub external_voyage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cutoff {
    #[serde(rename = "cyCutoffDate", skip_serializing_if = "Option::is_none")]
    pub cy_cutoff_date: Option<NaiveDateTime>,
    #[serde(rename = "docCutoffDate", skip_serializing_if = "Option::is_none")]
    pub doc_cutoff_date: Option<NaiveDateTime>,
    #[serde(rename = "vgmCutoffDate", skip_serializing_if = "Option::is_none")]
    pub vgm_cutoff_date: Option<NaiveDateTime>,
}

impl Cutoff {
    /// `None` unless at least one sub-field is present (invariant I7).
    pub fn from_parts(
        cy: Option<NaiveDateTime>,
        doc: Option<NaiveDateTime>,
        vgm: Option<NaiveDateTime>,
    ) -> Option<Self> {
        if cy.is_none() && doc.is_none() && vgm.is_none() {
            None
        } else {
            Some(Self {
                cy_cutoff_date: cy,
                doc_cutoff_date: doc,
                vgm_cutoff_date: vgm,
            })
        }
    }
}

/// One transportation segment between two points under one conveyance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    #[serde(rename = "pointFrom")]
    pub point_from: PointBase,
    #[serde(rename = "pointTo")]
    pub point_to: PointBase,
    pub etd: NaiveDateTime,
    pub eta: NaiveDateTime,
    #[serde(rename = "transitTime")]
    pub transit_time: i64,
    pub transportations: Transportation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Service>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voyages: Option<Voyage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoffs: Option<Cutoff>,
}

/// A single unified sailing normalized from a carrier-specific document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub scac: String,
    #[serde(rename = "pointFrom")]
    pub point_from: String,
    #[serde(rename = "pointTo")]
    pub point_to: String,
    pub etd: NaiveDateTime,
    pub eta: NaiveDateTime,
    #[serde(rename = "transitTime")]
    pub transit_time: i64,
    pub transshipment: bool,
    pub legs: Vec<Leg>,
}

impl Schedule {
    /// Validate the schedule's structural invariants. Returns the first
    /// violation found, or `Ok(())` if the schedule may be emitted.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let Some(first_leg) = self.legs.first() else {
            return Err("schedule has no legs".to_string());
        };
        let last_leg = self.legs.last().expect("non-empty legs");

        if first_leg.point_from.location_code != self.point_from {
            return Err(format!(
                "legs[0].pointFrom ({}) does not match schedule.pointFrom ({})",
                first_leg.point_from.location_code, self.point_from
            ));
        }
        if last_leg.point_to.location_code != self.point_to {
            return Err(format!(
                "legs[-1].pointTo ({}) does not match schedule.pointTo ({})",
                last_leg.point_to.location_code, self.point_to
            ));
        }

        let expected_transshipment = self.legs.len() > 1;
        if self.transshipment != expected_transshipment {
            return Err(format!(
                "transshipment={} but leg count is {}",
                self.transshipment,
                self.legs.len()
            ));
        }

        if self.etd != first_leg.etd {
            return Err("schedule.etd does not match legs[0].etd".to_string());
        }
        if self.eta != last_leg.eta {
            return Err("schedule.eta does not match legs[-1].eta".to_string());
        }

        for (i, leg) in self.legs.iter().enumerate() {
            if leg.eta < leg.etd {
                return Err(format!("leg {i} has eta before etd"));
            }
        }

        if self.transit_time < 0 {
            return Err("transitTime is negative".to_string());
        }

        for (i, leg) in self.legs.iter().enumerate() {
            if leg.transportations.reference_type.as_deref() == Some("IMO")
                && leg.transportations.reference.is_none()
            {
                return Err(format!("leg {i} has referenceType=IMO but no reference"));
            }
        }

        Ok(())
    }
}

/// The final aggregated, validated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub productid: Uuid,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "noofSchedule")]
    pub noof_schedule: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Vec<Schedule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProductEnvelope {
    pub fn found(productid: Uuid, origin: String, destination: String, schedules: Vec<Schedule>) -> Self {
        Self {
            productid,
            origin,
            destination,
            noof_schedule: schedules.len(),
            schedules: Some(schedules),
            details: None,
        }
    }

    pub fn not_found(productid: Uuid, origin: String, destination: String) -> Self {
        Self {
            productid,
            origin: origin.clone(),
            destination: destination.clone(),
            noof_schedule: 0,
            schedules: None,
            details: Some(format!("{origin}-{destination} schedule not found")),
        }
    }
}
