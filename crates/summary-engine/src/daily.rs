use std::collections::BTreeMap;

use chrono::NaiveDate;
use portfolio_core::{round_scale, safe_div, CashFlow, PriceSource, TransactionRecord};
use profit_engine::{aggregated_holdings, CostBasisAllocator};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use xirr_engine::{build_cash_flows, XirrDamper};

/// Portfolio-wide totals for one calendar date, scale-10 rounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub xirr_annual_return: Decimal,
    pub realized_profit: Decimal,
    pub unrealized_profit: Decimal,
    pub total_profit: Decimal,
    pub earnings_per_day: Decimal,
}

/// Running accumulation over an instrument group walk.
#[derive(Debug, Default)]
struct PortfolioTotals {
    total_value: Decimal,
    realized_profit: Decimal,
    unrealized_profit: Decimal,
    cash_flows: Vec<CashFlow>,
}

/// Builds a portfolio [`DailySummary`] from every transaction dated at or
/// before the calculation date, valuing open positions through the
/// injected [`PriceSource`].
pub struct DailySummaryCalculator;

impl DailySummaryCalculator {
    pub fn calculate(
        records: &[TransactionRecord],
        prices: &dyn PriceSource,
        date: NaiveDate,
    ) -> DailySummary {
        let mut groups: BTreeMap<i64, Vec<TransactionRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.date <= date) {
            groups
                .entry(record.instrument_id)
                .or_default()
                .push(record.clone());
        }
        if groups.is_empty() {
            return Self::empty(date);
        }

        let mut totals = PortfolioTotals::default();
        for (instrument_id, group) in &groups {
            Self::accumulate_instrument(*instrument_id, group, prices, date, &mut totals);
        }

        let xirr = XirrDamper::adjusted_xirr(&totals.cash_flows, date);
        let xirr_rate = xirr.and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO);
        DailySummary {
            date,
            total_value: round_scale(totals.total_value),
            xirr_annual_return: round_scale(xirr_rate),
            realized_profit: round_scale(totals.realized_profit),
            unrealized_profit: round_scale(totals.unrealized_profit),
            total_profit: round_scale(totals.realized_profit + totals.unrealized_profit),
            earnings_per_day: earnings_per_day(totals.total_value, xirr_rate),
        }
    }

    pub fn empty(date: NaiveDate) -> DailySummary {
        DailySummary {
            date,
            ..Default::default()
        }
    }

    fn accumulate_instrument(
        instrument_id: i64,
        group: &[TransactionRecord],
        prices: &dyn PriceSource,
        date: NaiveDate,
        totals: &mut PortfolioTotals,
    ) {
        let holdings = aggregated_holdings(group);

        let realized_profit: Decimal = group
            .iter()
            .map(|r| r.platform)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .map(|platform| {
                let ledger: Vec<TransactionRecord> = group
                    .iter()
                    .filter(|r| r.platform == platform)
                    .cloned()
                    .collect();
                CostBasisAllocator::allocate(&ledger).realized_profit()
            })
            .sum();

        let current_value = if holdings.total_quantity > Decimal::ZERO {
            let price = match prices.price_on(instrument_id, date) {
                Ok(price) => Some(price),
                // No close for the date: fall back to the last known price
                // before giving up on the instrument.
                Err(err) => {
                    tracing::debug!(instrument_id, %date, "no dated price: {err}");
                    prices.latest_price(instrument_id)
                }
            };
            match price {
                Some(price) => holdings.total_quantity * price,
                None => {
                    tracing::warn!(instrument_id, %date, "no price at all, skipping instrument");
                    return;
                }
            }
        } else {
            Decimal::ZERO
        };
        let unrealized_profit = current_value - holdings.total_investment;

        // Fully exited and nothing earned: contributes nothing to the day.
        if current_value <= Decimal::ZERO && realized_profit <= Decimal::ZERO {
            return;
        }

        totals.total_value += current_value;
        totals.realized_profit += realized_profit;
        totals.unrealized_profit += unrealized_profit;
        totals
            .cash_flows
            .extend(build_cash_flows(group, current_value, date));
    }
}

/// `total_value * annual_rate / 365.25`, scale 10.
pub fn earnings_per_day(total_value: Decimal, xirr_rate: Decimal) -> Decimal {
    safe_div(
        total_value * xirr_rate,
        Decimal::from_f64(portfolio_core::DAYS_PER_YEAR).unwrap_or(Decimal::ONE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_core::{Platform, PortfolioError, TransactionType};
    use rust_decimal_macros::dec;

    struct FixedPrices(BTreeMap<i64, Decimal>);

    impl PriceSource for FixedPrices {
        fn price_on(&self, instrument_id: i64, date: NaiveDate) -> Result<Decimal, PortfolioError> {
            self.0
                .get(&instrument_id)
                .copied()
                .ok_or(PortfolioError::PriceUnavailable {
                    instrument_id,
                    date,
                })
        }

        fn latest_price(&self, instrument_id: i64) -> Option<Decimal> {
            self.0.get(&instrument_id).copied()
        }
    }

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    fn tx(
        id: i64,
        instrument_id: i64,
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
            platform: Platform::Swedbank,
            instrument_id,
        }
    }

    #[test]
    fn test_empty_transactions_give_zeroed_summary() {
        let prices = FixedPrices(BTreeMap::new());
        let summary = DailySummaryCalculator::calculate(&[], &prices, day(10));
        assert_eq!(summary, DailySummaryCalculator::empty(day(10)));
        assert_eq!(summary.total_value, Decimal::ZERO);
    }

    #[test]
    fn test_single_instrument_summary() {
        let records = vec![tx(1, 1, TransactionType::Buy, dec!(10), dec!(100), day(0))];
        let prices = FixedPrices(BTreeMap::from([(1, dec!(110))]));
        let summary = DailySummaryCalculator::calculate(&records, &prices, day(90));
        assert_eq!(summary.total_value, dec!(1100));
        assert_eq!(summary.unrealized_profit, dec!(100));
        assert_eq!(summary.realized_profit, Decimal::ZERO);
        assert_eq!(summary.total_profit, dec!(100));
        assert!(summary.xirr_annual_return > Decimal::ZERO);
        assert!(summary.earnings_per_day > Decimal::ZERO);
    }

    #[test]
    fn test_future_transactions_excluded() {
        let records = vec![
            tx(1, 1, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, 1, TransactionType::Buy, dec!(90), dec!(100), day(50)),
        ];
        let prices = FixedPrices(BTreeMap::from([(1, dec!(100))]));
        let summary = DailySummaryCalculator::calculate(&records, &prices, day(10));
        assert_eq!(summary.total_value, dec!(1000));
    }

    #[test]
    fn test_missing_price_skips_instrument_not_batch() {
        let records = vec![
            tx(1, 1, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, 2, TransactionType::Buy, dec!(5), dec!(50), day(0)),
        ];
        // Only instrument 1 has a price; instrument 2 is skipped with a warn.
        let prices = FixedPrices(BTreeMap::from([(1, dec!(120))]));
        let summary = DailySummaryCalculator::calculate(&records, &prices, day(30));
        assert_eq!(summary.total_value, dec!(1200));
        assert_eq!(summary.unrealized_profit, dec!(200));
    }

    #[test]
    fn test_closed_position_contributes_realized_profit() {
        let records = vec![
            tx(1, 1, TransactionType::Buy, dec!(10), dec!(100), day(0)),
            tx(2, 1, TransactionType::Sell, dec!(10), dec!(120), day(30)),
        ];
        let prices = FixedPrices(BTreeMap::new());
        let summary = DailySummaryCalculator::calculate(&records, &prices, day(40));
        assert_eq!(summary.total_value, Decimal::ZERO);
        assert_eq!(summary.realized_profit, dec!(200));
        assert_eq!(summary.total_profit, dec!(200));
    }

    #[test]
    fn test_earnings_per_day() {
        let earnings = earnings_per_day(dec!(1000), dec!(0.1));
        assert_eq!(earnings.round_dp(6), dec!(0.273785));
    }
}
