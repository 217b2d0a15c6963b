//! HTTP surface, background jobs and delivery services of the report scheduler.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
