//! `MetricSource` implementations.
//!
//! - [`HealthKitExport`]: an Apple Health `export.xml`, aggregated per UTC
//!   day.
//! - [`DemoSource`]: deterministic synthetic history for demo accounts.

pub mod demo;
pub mod error;
pub mod healthkit;

pub use demo::DemoSource;
pub use error::{ConnectorError, Result};
pub use healthkit::HealthKitExport;
