//! Freight Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait all microservices must implement
//! - The unified schedule domain model (Schedule, Leg, ProductEnvelope, ...)
//! - Error handling utilities
//! - Configuration management

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::{PoolConfig, Secret, ServiceConfig};
pub use domain::*;
pub use error::{FreightError, Result};
pub use service::{DependencyStatus, FreightService, HealthStatus, MicroserviceRuntime, ReadinessStatus};
