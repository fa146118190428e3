//! Domain models for `usagebar`.
//!
//! ## Submodules
//!
//! - [`usage`] - Quota windows (`UsageSnapshot`, `UsageLimit`)
//! - [`profile`] - Account metadata (`ProfileSnapshot`, `Account`, `Organization`)
//! - [`error_state`] - User-facing error classification

mod error_state;
mod profile;
mod usage;

pub use error_state::{ErrorCategory, ErrorState};
pub use profile::{Account, Organization, ProfileSnapshot};
pub use usage::{UsageLimit, UsageSnapshot};
