//! Meter, price, and report token usage for text-generation requests.

pub mod cli;
pub mod config;
pub mod cost;
pub mod ingest;
pub mod output;
pub mod report;
pub mod sink;
pub mod tracker;
pub mod types;

pub use cost::{ModelRates, PriceTable};
pub use report::{Report, ReportError, ReportFormat};
pub use sink::{DirSink, MemorySink, ReportSink, SinkError};
pub use tracker::MetricsTracker;
pub use types::{Measurement, ModelTotals, Snapshot};
