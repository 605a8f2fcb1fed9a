//! # NudgePay Worker Library
//!
//! This library provides the background side of NudgePay: configuration
//! loading and the periodic reminder sweep.
//!
//! ## Modules
//!
//! - `config`: Environment-based configuration
//! - `scheduler`: Fixed-interval sweep over all organizations

pub mod config;
pub mod scheduler;
