//! End-to-end adapter scenarios against a mock carrier endpoint, covering
//! the six concrete cases carried over from the original system behavior.

use std::sync::Arc;

use chrono::NaiveDate;
use freight_cache::{CacheClient, InMemoryCacheClient};
use freight_core::config::{PoolConfig, Secret};
use freight_core::{ScheduleFilters, SearchRange, StartDateType, UnLocode};
use schedule_aggregator::adapters::cma::CmaAdapter;
use schedule_aggregator::adapters::hmm::HmmAdapter;
use schedule_aggregator::adapters::zim::ZimAdapter;
use schedule_aggregator::adapters::CarrierAdapter;
use schedule_aggregator::http_client::HttpClientFacade;
use schedule_aggregator::request::ScheduleSearchRequest;
use schedule_aggregator::settings::{CarrierTokenSettings, Settings, ZimSettings};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(origin: &str, destination: &str, filters: ScheduleFilters) -> ScheduleSearchRequest {
    ScheduleSearchRequest {
        origin: UnLocode::parse(origin).unwrap(),
        destination: UnLocode::parse(destination).unwrap(),
        search_range: SearchRange::SevenDays,
        start_date_type: StartDateType::Departure,
        departure_date: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
        arrival_date: None,
        filters,
    }
}

fn settings_with(cma_url: &str, zim_url: &str, zim_token_url: &str, hmm_url: &str) -> Settings {
    Settings {
        cma: CarrierTokenSettings {
            url: cma_url.to_string(),
            token: Secret::new("cma-token"),
        },
        zim: ZimSettings {
            url: zim_url.to_string(),
            token_url: zim_token_url.to_string(),
            subscription_key: Secret::new("zim-subscription"),
            client_id: Secret::new("zim-client"),
            client_secret: Secret::new("zim-secret"),
        },
        hmm: CarrierTokenSettings {
            url: hmm_url.to_string(),
            token: Secret::new("hmm-token"),
        },
        maersk: CarrierTokenSettings {
            url: String::new(),
            token: Secret::new("maersk-token"),
        },
        generic: Default::default(),
    }
}

fn client(cache: Arc<dyn CacheClient>) -> HttpClientFacade {
    HttpClientFacade::new(&PoolConfig::default(), cache)
}

/// Matches requests that carry no `Range` header, distinguishing a CMA
/// adapter's first page from its follow-up pages in the paging scenarios.
struct NoRangeHeader;

impl wiremock::Match for NoRangeHeader {
    fn matches(&self, request: &wiremock::Request) -> bool {
        !request.headers.contains_key("range")
    }
}

/// Scenario 1: ZIM normalizes a two-leg transshipment route and tags the
/// non-feeder leg's vessel reference as IMO per `map_imo`.
#[tokio::test]
async fn zim_direct_vessel_with_transshipment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "zim-access-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "routes": [{
                "legs": [
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
                    {
                        "legOrder": 2,
                        "fromPoint": {"name": "Singapore", "code": "SGSIN"},
                        "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                        "etd": "2026-01-11T00:00:00",
                        "eta": "2026-01-25T00:00:00",
                        "transportType": "TO BE NAMED",
                        "vesselName": "EVER GIVEN",
                        "line": "ZCA",
                        "imo": "1234567",
                    },
                ],
            }],
        })))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(
        "",
        &format!("{}/schedules", server.uri()),
        &format!("{}/token", server.uri()),
        "",
    );
    let req = request("CNSHA", "USLAX", ScheduleFilters::default());

    let schedules = ZimAdapter::new()
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("zim fetch succeeds");

    assert_eq!(schedules.len(), 1);
    let schedule = &schedules[0];
    assert!(schedule.transshipment);
    assert_eq!(schedule.legs[1].transportations.reference.as_deref(), Some("1234567"));
}

/// Scenario 2: CMA's first call returns a 206 with a `Content-Range`
/// announcing more items than the page contains. Follow-up pages are
/// requested with a `Range: N-N+49` header, not query-param paging, and
/// their routings are folded into the same result set.
#[tokio::test]
async fn cma_pages_a_206_response_to_completion() {
    let server = MockServer::start().await;

    fn routing_with_imo(imo: &str) -> serde_json::Value {
        json!({
            "routings": [{
                "carrierCode": "CMDU",
                "legs": [{
                    "departure": {"portName": "Shanghai", "portCode": "CNSHA", "date": "2026-01-01T00:00:00"},
                    "arrival": {"portName": "Los Angeles", "portCode": "USLAX", "date": "2026-01-15T00:00:00"},
                    "conveyance": "TO BE NAMED",
                    "vesselIMO": imo,
                }],
            }],
        })
    }

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .and(wiremock::matchers::query_param("carrierCode", "0001"))
        .and(NoRangeHeader)
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "items 0-49/120")
                .insert_header("x-shipping-company-routings", "0001")
                .set_body_json(routing_with_imo("9454448")),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .and(wiremock::matchers::header("range", "50-99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(routing_with_imo("9454449")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .and(wiremock::matchers::header("range", "100-149"))
        .respond_with(ResponseTemplate::new(200).set_body_json(routing_with_imo("9454450")))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(&format!("{}/schedules", server.uri()), "", "", "");
    let req = request("CNSHA", "USLAX", ScheduleFilters::default());

    let schedules = CmaAdapter::new("CMDU")
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("cma fetch succeeds");

    assert_eq!(schedules.len(), 3);
}

/// Scenario 2b: when the 206 response's `X-Shipping-Company-Routings` header
/// names more than one carrier, follow-up pages drop the carrier filter
/// entirely and fall back to `specificRoutings=Commercial`.
#[tokio::test]
async fn cma_follow_up_pages_drop_carrier_filter_on_multi_routing_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .and(wiremock::matchers::query_param("carrierCode", "0001"))
        .and(NoRangeHeader)
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "items 0-49/60")
                .insert_header("x-shipping-company-routings", "0001, 0015")
                .set_body_json(json!({ "routings": [] })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .and(wiremock::matchers::header("range", "50-99"))
        .and(wiremock::matchers::query_param("specificRoutings", "Commercial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "routings": [{
                "carrierCode": "APLU",
                "legs": [{
                    "departure": {"portName": "Shanghai", "portCode": "CNSHA", "date": "2026-01-01T00:00:00"},
                    "arrival": {"portName": "Los Angeles", "portCode": "USLAX", "date": "2026-01-15T00:00:00"},
                    "conveyance": "TO BE NAMED",
                    "vesselIMO": "9454448",
                }],
            }],
        })))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(&format!("{}/schedules", server.uri()), "", "", "");
    let req = request("CNSHA", "USLAX", ScheduleFilters::default());

    let schedules = CmaAdapter::new("CMDU")
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("cma fetch succeeds");

    assert_eq!(schedules.len(), 1);
}

/// Scenario 3: a repeated HMM search within the cache TTL window is
/// answered from the cache and never reaches the mock server a second time.
#[tokio::test]
async fn hmm_cache_hit_avoids_a_second_http_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schedules": [{
                "main": [{
                    "polName": "Busan", "polCd": "KRPUS",
                    "podName": "Long Beach", "podCd": "USLGB",
                    "etd": "2026-01-01T00:00:00", "eta": "2026-01-15T00:00:00",
                    "vslTypCd": "TO BE NAMED", "vslNm": "HMM ALGECIRAS", "vslImo": "9863297",
                }],
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with("", "", "", &format!("{}/schedules", server.uri()));
    let req = request("KRPUS", "USLGB", ScheduleFilters::default());
    let adapter = HmmAdapter::new();

    let first = adapter.fetch(&http_client, &cache, &settings, &req).await.unwrap();
    let second = adapter.fetch(&http_client, &cache, &settings, &req).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    server.verify().await;
}

/// Scenario 4: `direct_only = true` keeps a single-leg route and drops a
/// transshipment one drawn from the same ZIM document.
#[tokio::test]
async fn zim_direct_only_filters_out_transshipment_routes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "zim-access-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "routes": [
                {
                    "legs": [{
                        "legOrder": 1,
                        "fromPoint": {"name": "Shanghai", "code": "CNSHA"},
                        "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                        "etd": "2026-01-01T00:00:00",
                        "eta": "2026-01-15T00:00:00",
                        "transportType": "TO BE NAMED",
                        "vesselName": "EVER GIVEN",
                        "line": "ZCA",
                        "imo": "1234567",
                    }],
                },
                {
                    "legs": [
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
                        {
                            "legOrder": 2,
                            "fromPoint": {"name": "Singapore", "code": "SGSIN"},
                            "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                            "etd": "2026-01-11T00:00:00",
                            "eta": "2026-01-25T00:00:00",
                            "transportType": "TO BE NAMED",
                            "vesselName": "OTHER VESSEL",
                            "line": "ZCA",
                            "imo": "7654321",
                        },
                    ],
                },
            ],
        })))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(
        "",
        &format!("{}/schedules", server.uri()),
        &format!("{}/token", server.uri()),
        "",
    );
    let filters = ScheduleFilters {
        direct_only: Some(true),
        ..Default::default()
    };
    let req = request("CNSHA", "USLAX", filters);

    let schedules = ZimAdapter::new()
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("zim fetch succeeds");

    assert_eq!(schedules.len(), 1);
    assert!(!schedules[0].transshipment);
}

/// Scenario 5: an upstream 500 is absorbed into an empty result rather than
/// propagating as an error, so one carrier's outage never fails the whole
/// fan-out at the adapter level.
#[tokio::test]
async fn zim_server_error_yields_empty_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "zim-access-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(
        "",
        &format!("{}/schedules", server.uri()),
        &format!("{}/token", server.uri()),
        "",
    );
    let req = request("CNSHA", "USLAX", ScheduleFilters::default());

    let schedules = ZimAdapter::new()
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("a 500 body is absorbed, not an error");

    assert!(schedules.is_empty());
}

/// Scenario 6: the IMO-mapping fallback ladder applied inside the real ZIM
/// adapter, exercised end to end instead of as a unit test on the bare
/// helper function.
#[tokio::test]
async fn zim_imo_fallback_ladder_applies_through_the_adapter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "zim-access-token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "routes": [{
                "legs": [{
                    "legOrder": 1,
                    "fromPoint": {"name": "Shanghai", "code": "CNSHA"},
                    "toPoint": {"name": "Los Angeles", "code": "USLAX"},
                    "etd": "2026-01-01T00:00:00",
                    "eta": "2026-01-15T00:00:00",
                    "transportType": "Land Trans",
                }],
            }],
        })))
        .mount(&server)
        .await;

    let cache: Arc<dyn CacheClient> = Arc::new(InMemoryCacheClient::new());
    let http_client = client(cache.clone());
    let settings = settings_with(
        "",
        &format!("{}/schedules", server.uri()),
        &format!("{}/token", server.uri()),
        "",
    );
    let req = request("CNSHA", "USLAX", ScheduleFilters::default());

    let schedules = ZimAdapter::new()
        .fetch(&http_client, &cache, &settings, &req)
        .await
        .expect("zim fetch succeeds");

    assert_eq!(schedules[0].legs[0].transportations.reference.as_deref(), Some("3"));
}
