//! Persistence layer for the report scheduler.
//!
//! This crate contains:
//! - Database connection management (central catalog and lazily opened tenant pools)
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store contracts

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;
pub mod tenant_pools;

pub use tenant_pools::{TenantPoolConfig, TenantPools};
