//! Aggregate metrics on top of the profit and XIRR engines: per-instrument
//! figures, portfolio daily summaries, and batch recomputation over
//! historical dates.

pub mod batch;
pub mod daily;
pub mod metrics;

pub use batch::{BatchFailure, BatchOutcome, BatchXirrRecalculator, SummarySink};
pub use daily::{DailySummary, DailySummaryCalculator};
pub use metrics::{instrument_metrics, InstrumentMetrics};
