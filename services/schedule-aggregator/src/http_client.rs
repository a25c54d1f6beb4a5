//! Shared HTTP client facade.
//!
//! A pooled `reqwest::Client` wrapping the three response shapes adapters
//! see in practice: a single decoded JSON document (200), CMA's paging
//! protocol (206 + `Content-Range`/`X-Shipping-Company-Routings`), and
//! Maersk's newline-delimited streaming JSON. Transport-layer failures
//! (connect, timeout, read) are allowed to propagate — the task manager
//! converts them into per-task failures.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use bytes::{Buf, Bytes};
use freight_core::PoolConfig;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{error, warn};

use freight_cache::CacheClient;
use std::sync::Arc;

/// The outcome of a non-streaming `parse` call.
pub enum ParseOutcome {
    /// HTTP 200, decoded body.
    Document(serde_json::Value),
    /// HTTP 206: the adapter must orchestrate pagination itself.
    Partial(PartialResponse),
    /// 4xx/5xx, or a body that failed to decode: no schedules.
    Empty,
}

/// The bits of a 206 response CMA's paging protocol needs.
pub struct PartialResponse {
    pub headers: reqwest::header::HeaderMap,
    pub body: serde_json::Value,
}

impl PartialResponse {
    /// Parses `Content-Range: items N-M/TOTAL` into `(n, m, total)`.
    pub fn content_range(&self) -> Option<(u64, u64, u64)> {
        let raw = self.headers.get("content-range")?.to_str().ok()?;
        let (_, range_and_total) = raw.split_once(' ')?;
        let (range, total) = range_and_total.split_once('/')?;
        let (n, m) = range.split_once('-')?;
        Some((n.parse().ok()?, m.parse().ok()?, total.parse().ok()?))
    }

    pub fn shipping_company_routings(&self) -> Option<Vec<String>> {
        let raw = self.headers.get("x-shipping-company-routings")?.to_str().ok()?;
        Some(raw.split(',').map(|s| s.trim().to_string()).collect())
    }
}

/// The shared connection pool facade every adapter calls through.
pub struct HttpClientFacade {
    client: Client,
    cache: Arc<dyn CacheClient>,
}

impl HttpClientFacade {
    pub fn new(pool_config: &PoolConfig, cache: Arc<dyn CacheClient>) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(pool_config.max_keep_alive_connection)
            .pool_idle_timeout(Duration::from_secs(pool_config.keep_alive_expiry_secs))
            .connect_timeout(Duration::from_secs(pool_config.connect_timeout_secs))
            .timeout(Duration::from_secs(pool_config.pool_timeout_secs + pool_config.async_default_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client, cache }
    }

    /// Non-streaming `parse`. Decodes 200 as JSON and schedules
    /// a background cache write when `cache_key` is supplied; returns the
    /// raw 206 response for CMA-style paging; yields `Empty` on any other
    /// status or decode failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn parse(
        &self,
        method: Method,
        url: &str,
        params: Option<&HashMap<String, String>>,
        headers: Option<reqwest::header::HeaderMap>,
        json: Option<&serde_json::Value>,
        form: Option<&HashMap<String, String>>,
        cache_key: Option<uuid::Uuid>,
        cache_expire: Option<Duration>,
    ) -> Result<ParseOutcome, reqwest::Error> {
        let mut builder = self.client.request(method, url);
        if let Some(params) = params {
            builder = builder.query(params);
        }
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }
        if let Some(json) = json {
            builder = builder.json(json);
        }
        if let Some(form) = form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        Ok(self.handle_response(response, cache_key, cache_expire).await)
    }

    async fn handle_response(
        &self,
        response: Response,
        cache_key: Option<uuid::Uuid>,
        cache_expire: Option<Duration>,
    ) -> ParseOutcome {
        match response.status() {
            StatusCode::OK => match response.json::<serde_json::Value>().await {
                Ok(body) => {
                    if let Some(key) = cache_key {
                        let cache = self.cache.clone();
                        let body = body.clone();
                        tokio::spawn(async move {
                            freight_cache::CacheClientExt::set(&*cache, key, &body, cache_expire).await;
                        });
                    }
                    ParseOutcome::Document(body)
                }
                Err(e) => {
                    warn!(error = %e, "upstream body failed to decode as JSON");
                    ParseOutcome::Empty
                }
            },
            StatusCode::PARTIAL_CONTENT => {
                let headers = response.headers().clone();
                match response.json::<serde_json::Value>().await {
                    Ok(body) => ParseOutcome::Partial(PartialResponse { headers, body }),
                    Err(e) => {
                        warn!(error = %e, "206 body failed to decode as JSON");
                        ParseOutcome::Empty
                    }
                }
            }
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
                error!(status = %response.status(), url = %response.url(), "upstream server error");
                ParseOutcome::Empty
            }
            other => {
                warn!(status = %other, url = %response.url(), "upstream returned a non-success status");
                ParseOutcome::Empty
            }
        }
    }

    /// Streaming `parse` for Maersk's newline-delimited JSON protocol. The
    /// response is closed on every exit path: stream exhaustion, a decode
    /// error, or the caller dropping the stream early (cancellation).
    pub async fn parse_stream(
        &self,
        method: Method,
        url: &str,
        params: Option<&HashMap<String, String>>,
        headers: Option<reqwest::header::HeaderMap>,
    ) -> Result<Pin<Box<dyn Stream<Item = serde_json::Value> + Send>>, reqwest::Error> {
        let mut builder = self.client.request(method, url);
        if let Some(params) = params {
            builder = builder.query(params);
        }
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }

        let response = builder.send().await?;
        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "streaming upstream returned a non-200 status");
            return Ok(Box::pin(futures_util::stream::empty()));
        }

        let byte_stream = response.bytes_stream();
        let stream = futures_util::stream::unfold(
            (byte_stream, Bytes::new()),
            |(mut byte_stream, mut carry)| async move {
                loop {
                    if let Some(pos) = carry.iter().position(|&b| b == b'\n') {
                        let line = carry.split_to(pos);
                        carry.advance(1);
                        if line.is_empty() {
                            continue;
                        }
                        return match serde_json::from_slice::<serde_json::Value>(&line) {
                            Ok(value) => Some((value, (byte_stream, carry))),
                            Err(e) => {
                                warn!(error = %e, "streamed NDJSON record failed to decode, skipping");
                                continue;
                            }
                        };
                    }

                    match byte_stream.next().await {
                        Some(Ok(chunk)) => carry.extend_from_slice(&chunk),
                        Some(Err(e)) => {
                            warn!(error = %e, "streaming read error, closing response");
                            return None;
                        }
                        None => {
                            if carry.is_empty() {
                                return None;
                            }
                            let line = std::mem::take(&mut carry);
                            return match serde_json::from_slice::<serde_json::Value>(&line) {
                                Ok(value) => Some((value, (byte_stream, Bytes::new()))),
                                Err(_) => None,
                            };
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}
