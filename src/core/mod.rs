//! Core types, abstractions and the reconciliation logic

pub mod config;
pub mod error;
pub mod log;
pub mod reconcile;
pub mod record;
pub mod source;

// Re-export main types for cleaner imports
pub use error::{FetchError, PipelineError, ReconcileError, SinkError};
pub use record::{DailyRecord, GoldObservation, RateObservation};
pub use source::{Clock, FixedClock, GoldPriceSource, RateSource, RecordSink, SystemClock};
