//! # NudgePay Shared Library
//!
//! This crate contains the data model, storage access, and the reminder
//! pipeline used by the NudgePay worker and request layer.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their queries
//! - `tenant`: Tenant scoping capability
//! - `clock`: Injectable time source
//! - `reminders`: Rendering, provisioning, dispatch, and sweeps

pub mod clock;
pub mod db;
pub mod models;
pub mod reminders;
pub mod tenant;

/// Current version of the NudgePay shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
