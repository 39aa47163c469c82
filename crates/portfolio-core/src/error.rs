use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("No price available for instrument {instrument_id} on {date}")]
    PriceUnavailable { instrument_id: i64, date: NaiveDate },

    #[error("Calculation error: {0}")]
    CalculationError(String),
}
