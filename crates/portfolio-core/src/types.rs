use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Buy/sell side of a portfolio transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Buy,
    Sell,
}

/// Trading venue the transaction was executed on.
///
/// Ledgers are keyed by (platform, instrument); the same instrument held on
/// two platforms is two independent ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    Trading212,
    Lightyear,
    Swedbank,
    Lhv,
    Binance,
    Unknown,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Trading212 => write!(f, "Trading212"),
            Platform::Lightyear => write!(f, "Lightyear"),
            Platform::Swedbank => write!(f, "Swedbank"),
            Platform::Lhv => write!(f, "LHV"),
            Platform::Binance => write!(f, "Binance"),
            Platform::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single buy or sell event as recorded by the caller.
///
/// The engine treats records as read-only input. Derived figures
/// (average cost, realized/unrealized profit, remaining quantity) are
/// returned in [`TransactionProfit`] keyed by `id`, never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub tx_type: TransactionType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub date: NaiveDate,
    pub platform: Platform,
    pub instrument_id: i64,
}

impl TransactionRecord {
    pub fn is_buy(&self) -> bool {
        self.tx_type == TransactionType::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.tx_type == TransactionType::Sell
    }
}

/// Derived per-transaction figures produced by the profit engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionProfit {
    pub average_cost: Decimal,
    pub realized_profit: Decimal,
    pub unrealized_profit: Decimal,
    pub remaining_quantity: Decimal,
}

/// Fold accumulator for one ledger: open cost and open quantity.
/// Reset per ledger, never shared across ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningState {
    pub total_cost: Decimal,
    pub current_quantity: Decimal,
}

/// A dated signed amount. Negative = outflow (investment),
/// positive = inflow (proceeds or mark-to-market valuation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub amount: f64,
    pub date: NaiveDate,
}

impl CashFlow {
    pub fn new(amount: f64, date: NaiveDate) -> Self {
        Self { amount, date }
    }
}

/// One close price for one instrument on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Sort a ledger into its canonical processing order: date ascending,
/// id ascending. The id tie-break makes same-day transactions deterministic.
pub fn sort_ledger(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: i64, date: NaiveDate) -> TransactionRecord {
        TransactionRecord {
            id,
            tx_type: TransactionType::Buy,
            quantity: dec!(1),
            price: dec!(10),
            commission: dec!(0),
            date,
            platform: Platform::Trading212,
            instrument_id: 1,
        }
    }

    #[test]
    fn test_sort_ledger_date_then_id() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        let mut records = vec![record(3, d2), record(2, d1), record(1, d1)];
        sort_ledger(&mut records);
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::Lhv.to_string(), "LHV");
        assert_eq!(Platform::Trading212.to_string(), "Trading212");
    }
}
