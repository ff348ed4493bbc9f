//! Output formatting module
//!
//! Renders deploy outcomes, health reports and billing cycles.

mod formatter;

pub use formatter::{export_health_csv, write_health_csv, OutputFormat, ResultFormatter};
