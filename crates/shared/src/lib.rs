//! Shared utilities and common types for the report scheduler.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (API key hashing, tenant secret encryption)
//! - Common validation logic (recipient lists, time-of-day parsing)

pub mod crypto;
pub mod validation;
