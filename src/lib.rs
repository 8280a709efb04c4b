//! Uniform connectors and schema caching for MySQL, PostgreSQL and MSSQL.
//!
//! - [`services::database`]: the `Connector` contract, engine drivers and the
//!   connector factory
//! - [`services::cache`]: schema cache and cache-or-fetch orchestration
//! - [`services::storage`]: connection profile store

pub mod config;
pub mod services;
