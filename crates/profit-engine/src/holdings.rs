//! Holdings aggregation and the quantity/cost identities used by summary
//! calculations when per-transaction profit annotation is unavailable.

use std::collections::BTreeMap;

use portfolio_core::{safe_div, Platform, TransactionRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocator::{average_cost, CostBasisAllocator};

/// Open quantity and weighted-average cost for one ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentHoldings {
    pub quantity: Decimal,
    pub average_cost: Decimal,
}

/// Holdings summed across all of an instrument's platform ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedHoldings {
    pub total_quantity: Decimal,
    pub total_investment: Decimal,
}

/// Fold one ledger into its open quantity and average cost.
pub fn current_holdings(ledger: &[TransactionRecord]) -> CurrentHoldings {
    let state = CostBasisAllocator::allocate(ledger).state;
    CurrentHoldings {
        quantity: state.current_quantity,
        average_cost: average_cost(state.total_cost, state.current_quantity),
    }
}

/// Group an instrument's records by platform, fold each ledger separately,
/// and sum the open positions. Closed ledgers are skipped.
///
/// Investment is the fold's exact open cost, not `quantity * average_cost`;
/// the average is rounded to scale 10 and reconstituting from it would leak
/// rounding error into the totals.
pub fn aggregated_holdings(records: &[TransactionRecord]) -> AggregatedHoldings {
    let mut groups: BTreeMap<Platform, Vec<TransactionRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.platform).or_default().push(record.clone());
    }
    groups
        .values()
        .map(|ledger| CostBasisAllocator::allocate(ledger).state)
        .filter(|state| state.current_quantity > Decimal::ZERO)
        .fold(AggregatedHoldings::default(), |acc, state| {
            AggregatedHoldings {
                total_quantity: acc.total_quantity + state.current_quantity,
                total_investment: acc.total_investment + state.total_cost,
            }
        })
}

/// Σ buys − Σ sells, ignoring cost entirely.
pub fn net_quantity(records: &[TransactionRecord]) -> Decimal {
    records.iter().fold(Decimal::ZERO, |acc, tx| {
        if tx.is_buy() {
            acc + tx.quantity
        } else {
            acc - tx.quantity
        }
    })
}

/// Total spent on buys, commission included.
pub fn total_buys(records: &[TransactionRecord]) -> Decimal {
    records
        .iter()
        .filter(|tx| tx.is_buy())
        .map(|tx| tx.price * tx.quantity + tx.commission)
        .sum()
}

/// Total sell proceeds, net of commission.
pub fn total_sells(records: &[TransactionRecord]) -> Decimal {
    records
        .iter()
        .filter(|tx| tx.is_sell())
        .map(|tx| tx.price * tx.quantity - tx.commission)
        .sum()
}

pub fn buy_quantity(records: &[TransactionRecord]) -> Decimal {
    records
        .iter()
        .filter(|tx| tx.is_buy())
        .map(|tx| tx.quantity)
        .sum()
}

pub fn sell_quantity(records: &[TransactionRecord]) -> Decimal {
    records
        .iter()
        .filter(|tx| tx.is_sell())
        .map(|tx| tx.quantity)
        .sum()
}

/// Cost attributed to sold quantity at the average buy price.
fn sold_cost(records: &[TransactionRecord], buys: Decimal) -> Decimal {
    let bought = buy_quantity(records);
    if bought <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let avg_buy_price = safe_div(buys, bought);
    avg_buy_price * sell_quantity(records)
}

/// Coarse realized/unrealized split from quantity and cost totals alone.
/// Used when a full cost-basis allocation is not available for the ledger.
pub fn fallback_profits(
    records: &[TransactionRecord],
    current_value: Decimal,
) -> (Decimal, Decimal) {
    let buys = total_buys(records);
    let sells = total_sells(records);
    let bought = buy_quantity(records);
    let sold = sell_quantity(records);

    let realized = if sells <= Decimal::ZERO || buys <= Decimal::ZERO || bought <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        sells - safe_div(buys, bought) * sold
    };
    let unrealized = current_value - (buys - sold_cost(records, buys));
    (realized, unrealized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use portfolio_core::TransactionType;
    use rust_decimal_macros::dec;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    fn tx(
        id: i64,
        platform: Platform,
        tx_type: TransactionType,
        quantity: Decimal,
        price: Decimal,
        date: NaiveDate,
    ) -> TransactionRecord {
        TransactionRecord {
            id,
            tx_type,
            quantity,
            price,
            commission: Decimal::ZERO,
            date,
            platform,
            instrument_id: 3,
        }
    }

    #[test]
    fn test_current_holdings_buy_only() {
        let ledger = vec![
            tx(1, Platform::Swedbank, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, Platform::Swedbank, TransactionType::Buy, dec!(5), dec!(120), day(3)),
        ];
        let holdings = current_holdings(&ledger);
        assert_eq!(holdings.quantity, dec!(15));
        assert_eq!(holdings.average_cost.round_dp(3), dec!(106.667));
    }

    #[test]
    fn test_aggregated_holdings_across_platforms() {
        let records = vec![
            tx(1, Platform::Swedbank, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, Platform::Binance, TransactionType::Buy, dec!(2), dec!(50), day(1)),
            // Closed ledger on a third platform drops out.
            tx(3, Platform::Lhv, TransactionType::Buy, dec!(4), dec!(10), day(1)),
            tx(4, Platform::Lhv, TransactionType::Sell, dec!(4), dec!(12), day(2)),
        ];
        let aggregated = aggregated_holdings(&records);
        assert_eq!(aggregated.total_quantity, dec!(12));
        assert_eq!(aggregated.total_investment, dec!(1100));
    }

    #[test]
    fn test_aggregated_investment_is_exact() {
        // 1600 / 15 does not terminate at scale 10; the total must come
        // from the exact open cost, not the rounded average times quantity.
        let records = vec![
            tx(1, Platform::Lightyear, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, Platform::Lightyear, TransactionType::Buy, dec!(5), dec!(120), day(3)),
        ];
        let aggregated = aggregated_holdings(&records);
        assert_eq!(aggregated.total_quantity, dec!(15));
        assert_eq!(aggregated.total_investment, dec!(1600));
    }

    #[test]
    fn test_net_quantity_ignores_order() {
        let records = vec![
            tx(1, Platform::Lhv, TransactionType::Sell, dec!(4), dec!(12), day(2)),
            tx(2, Platform::Lhv, TransactionType::Buy, dec!(10), dec!(10), day(0)),
        ];
        assert_eq!(net_quantity(&records), dec!(6));
    }

    #[test]
    fn test_fallback_profits() {
        let records = vec![
            tx(1, Platform::Lhv, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, Platform::Lhv, TransactionType::Sell, dec!(4), dec!(110), day(5)),
        ];
        // avg buy 100; realized = 440 - 100*4 = 40
        // sold cost 400; unrealized = 660 - (1000 - 400) = 60
        let (realized, unrealized) = fallback_profits(&records, dec!(660));
        assert_eq!(realized, dec!(40));
        assert_eq!(unrealized, dec!(60));
    }

    #[test]
    fn test_fallback_profits_no_sells() {
        let records = vec![tx(1, Platform::Lhv, TransactionType::Buy, dec!(10), dec!(100), day(0))];
        let (realized, unrealized) = fallback_profits(&records, dec!(1100));
        assert_eq!(realized, Decimal::ZERO);
        assert_eq!(unrealized, dec!(100));
    }
}
