//! Output formatting for CLI.

mod json;
mod text;

pub use json::{AuthStatusOutput, DashboardOutput, ErrorOutput, JsonFormatter, UsageReport};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
