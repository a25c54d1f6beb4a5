//! Configuration management shared by every microservice in this workspace.

use crate::error::{FreightError, Result};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Process-wide HTTP/logging configuration, read once from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub http_bind: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "unknown".to_string()),
            http_bind: env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// Connection-pool, timeout, and retry parameters, loaded from a YAML file.
/// Field names match the YAML keys verbatim (camelCase) since this file is
/// shared with non-Rust tooling in the deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(rename = "maxClientConnection")]
    pub max_client_connection: usize,
    #[serde(rename = "maxKeepAliveConnection")]
    pub max_keep_alive_connection: usize,
    #[serde(rename = "keepAliveExpiry")]
    pub keep_alive_expiry_secs: u64,
    #[serde(rename = "connectTimeOut")]
    pub connect_timeout_secs: u64,
    #[serde(rename = "elswhereTimeOut")]
    pub pool_timeout_secs: u64,
    #[serde(rename = "asyncDefaultTimeOut")]
    pub async_default_timeout_secs: u64,
    #[serde(rename = "retryNumber")]
    pub retry_number: u32,
    #[serde(rename = "scheduleExpiry")]
    pub schedule_expiry_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_client_connection: 100,
            max_keep_alive_connection: 20,
            keep_alive_expiry_secs: 30,
            connect_timeout_secs: 5,
            pool_timeout_secs: 5,
            async_default_timeout_secs: 30,
            retry_number: 3,
            schedule_expiry_secs: 7200,
        }
    }
}

impl PoolConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| FreightError::Config(format!("invalid pool config yaml: {e}")))
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FreightError::Config(format!("cannot read {path}: {e}")))?;
        Self::from_yaml_str(&contents)
    }
}

/// A credential value that refuses to be printed except through `reveal()`.
///
/// Settings registries hold carrier credentials as `Secret` so that a stray
/// `{:?}` in a log line never leaks an API key or client secret.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
