//! The search request accepted at `POST /v1/schedules`.

use chrono::NaiveDate;
use freight_core::{FreightError, Result, ScheduleFilters, SearchRange, StartDateType, UnLocode};
use serde::Deserialize;

/// Wire shape of the search request. Deserialized directly from the JSON
/// body; [`ScheduleSearchRequest::validate`] enforces the cross-field rules
/// the wire format alone cannot express (mutually exclusive dates, etc.).
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSearchRequestBody {
    pub origin: String,
    pub destination: String,
    pub search_range: u8,
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub carrier_scac: Option<String>,
    #[serde(default)]
    pub vessel_imo: Option<String>,
    #[serde(default)]
    pub service_code: Option<String>,
    #[serde(default)]
    pub transshipment_port: Option<String>,
    #[serde(default)]
    pub direct_only: Option<bool>,
}

/// Validated request, ready to hand to the aggregator.
#[derive(Debug, Clone)]
pub struct ScheduleSearchRequest {
    pub origin: UnLocode,
    pub destination: UnLocode,
    pub search_range: SearchRange,
    pub start_date_type: StartDateType,
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
    pub filters: ScheduleFilters,
}

impl ScheduleSearchRequest {
    /// Date-window construction: `fromDate` is whichever of departure/arrival
    /// was supplied; `toDate` adds the search range.
    pub fn from_date(&self) -> NaiveDate {
        self.departure_date.or(self.arrival_date).expect("validated")
    }

    pub fn to_date(&self) -> NaiveDate {
        self.from_date() + chrono::Duration::days(self.search_range.duration_days())
    }
}

impl TryFrom<ScheduleSearchRequestBody> for ScheduleSearchRequest {
    type Error = FreightError;

    fn try_from(body: ScheduleSearchRequestBody) -> Result<Self> {
        let start_date_type = match (body.departure_date, body.arrival_date) {
            (Some(_), Some(_)) => {
                return Err(FreightError::InvalidRequest(
                    "departure_date and arrival_date are mutually exclusive".to_string(),
                ))
            }
            (Some(_), None) => StartDateType::Departure,
            (None, Some(_)) => StartDateType::Arrival,
            (None, None) => {
                return Err(FreightError::InvalidRequest(
                    "one of departure_date or arrival_date is required".to_string(),
                ))
            }
        };

        let search_range = SearchRange::from_code(body.search_range)?;
        let origin = UnLocode::parse(body.origin)?;
        let destination = UnLocode::parse(body.destination)?;

        let carrier_scac = body
            .carrier_scac
            .map(freight_core::Scac::parse)
            .transpose()?;
        let transshipment_port = body
            .transshipment_port
            .map(UnLocode::parse)
            .transpose()?;

        Ok(Self {
            origin,
            destination,
            search_range,
            start_date_type,
            departure_date: body.departure_date,
            arrival_date: body.arrival_date,
            filters: ScheduleFilters {
                carrier_scac,
                vessel_imo: body.vessel_imo,
                service_code: body.service_code,
                transshipment_port,
                direct_only: body.direct_only,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> ScheduleSearchRequestBody {
        ScheduleSearchRequestBody {
            origin: "USNYC".to_string(),
            destination: "SGSIN".to_string(),
            search_range: 1,
            departure_date: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            arrival_date: None,
            carrier_scac: None,
            vessel_imo: None,
            service_code: None,
            transshipment_port: None,
            direct_only: None,
        }
    }

    #[test]
    fn rejects_both_dates() {
        let mut b = body();
        b.arrival_date = Some(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
        assert!(ScheduleSearchRequest::try_from(b).is_err());
    }

    #[test]
    fn rejects_no_dates() {
        let mut b = body();
        b.departure_date = None;
        assert!(ScheduleSearchRequest::try_from(b).is_err());
    }

    #[test]
    fn rejects_invalid_search_range() {
        let mut b = body();
        b.search_range = 9;
        assert!(ScheduleSearchRequest::try_from(b).is_err());
    }

    #[test]
    fn computes_to_date_from_search_range() {
        let req = ScheduleSearchRequest::try_from(body()).unwrap();
        assert_eq!(req.to_date(), NaiveDate::from_ymd_opt(2026, 1, 8).unwrap());
    }
}
