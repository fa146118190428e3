// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # usagebar Store
//!
//! State management for usagebar.
//!
//! This crate provides:
//!
//! - **RefreshOrchestrator**: Polls the usage API and publishes a
//!   [`DashboardState`] through a watch channel
//! - **Settings**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use usagebar_store::{RefreshOrchestrator, Settings};
//!
//! let settings = Settings::load_default().await?;
//! let orchestrator = RefreshOrchestrator::new(api, settings.polling_config());
//! orchestrator.start().await;
//!
//! let mut rx = orchestrator.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{:?}", rx.borrow().usage);
//! }
//! ```

pub mod error;
pub mod persistence;
pub mod refresh;
pub mod settings;

pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, ensure_dir, load_json, load_json_or_default,
    save_json,
};
pub use refresh::{DashboardState, PollingConfig, RefreshOrchestrator, RefreshOutcome};
pub use settings::{LogLevel, MAX_REFRESH_INTERVAL_SECS, SecretStoreMode, Settings};
