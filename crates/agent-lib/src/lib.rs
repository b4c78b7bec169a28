//! Core library for the panel agent
//!
//! This crate provides:
//! - Request authorization (shared secret + client network policy)
//! - A last-sample cache and rate calculation for container stats
//! - The runtime backend capability interface and its Docker implementation
//! - Health checks and observability

pub mod auth;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod runtime;
pub mod stats;

pub use error::ConfigError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
