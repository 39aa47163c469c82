use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::PortfolioError;

/// Close-price lookup consumed by the summary calculations.
///
/// Implementations live at the persistence boundary; the engine only reads.
/// A missing price is reported through `Err`; callers decide whether to
/// skip the instrument or substitute a fallback.
pub trait PriceSource: Send + Sync {
    fn price_on(&self, instrument_id: i64, date: NaiveDate) -> Result<Decimal, PortfolioError>;

    /// Latest known price, used when a caller-supplied price is absent.
    fn latest_price(&self, instrument_id: i64) -> Option<Decimal>;
}
