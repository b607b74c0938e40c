//! Lead funnel aggregation: load processed leads, filter by counselor and
//! country, and derive per-stage and conversion metrics.

pub mod error;
pub mod funnel;
pub mod insights;
pub mod loader;
pub mod models;
pub mod report;
pub mod stage;
pub mod telemetry;
