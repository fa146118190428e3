// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `usagebar` Core
//!
//! Core types for the `usagebar` quota monitor.
//!
//! The types here are produced by the API client and published by the
//! refresh orchestrator. They are immutable once built: every successful
//! fetch produces fresh values that replace the previous ones wholesale.
//!
//! ## Key Types
//!
//! ### Usage
//! - [`UsageSnapshot`] - Rolling quota windows (5-hour, 7-day, per-model)
//! - [`UsageLimit`] - A single window's utilization and reset time
//!
//! ### Profile
//! - [`ProfileSnapshot`] - Account and organization metadata
//! - [`Account`] / [`Organization`]
//!
//! ### Errors
//! - [`ErrorState`] - User-facing classification of the last failed refresh
//! - [`ErrorCategory`] - Coarse grouping used for icons and hints

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    Account, ErrorCategory, ErrorState, Organization, ProfileSnapshot, UsageLimit, UsageSnapshot,
};
