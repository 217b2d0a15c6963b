//! Domain layer for the report scheduler.
//!
//! This crate contains:
//! - Domain models (Schedule, RecurrenceDescription, RelativeDateRange, ExecutionLogEntry)
//! - The recurrence engine and date range resolver
//! - Collaborator contracts (stores, tenant catalog, report engine, renderer, notifier)

pub mod models;
pub mod services;
