use chrono::NaiveDate;
use portfolio_core::TransactionRecord;
use profit_engine::{aggregated_holdings, calculate_instrument_profits};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use xirr_engine::{build_cash_flows, XirrDamper};

/// Aggregate figures for one instrument across all of its platform ledgers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetrics {
    pub total_investment: Decimal,
    pub current_value: Decimal,
    pub profit: Decimal,
    pub realized_profit: Decimal,
    pub unrealized_profit: Decimal,
    pub xirr: Option<f64>,
    pub quantity: Decimal,
}

impl InstrumentMetrics {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Compute an instrument's aggregate metrics as of `calculation_date`.
///
/// Realized profit comes from the per-platform cost-basis allocation;
/// unrealized profit is the open position marked at `current_price` minus
/// its remaining investment. The XIRR is the age-damped annualized return
/// over the instrument's full cash-flow history plus a synthetic inflow of
/// the current value.
pub fn instrument_metrics(
    records: &[TransactionRecord],
    current_price: Decimal,
    calculation_date: NaiveDate,
) -> InstrumentMetrics {
    if records.is_empty() {
        return InstrumentMetrics::empty();
    }

    let holdings = aggregated_holdings(records);
    let current_value = if holdings.total_quantity > Decimal::ZERO {
        holdings.total_quantity * current_price
    } else {
        Decimal::ZERO
    };

    let profits = calculate_instrument_profits(records, current_price, None);
    let realized_profit: Decimal = records
        .iter()
        .filter(|tx| tx.is_sell())
        .filter_map(|tx| profits.get(&tx.id))
        .map(|p| p.realized_profit)
        .sum();
    let unrealized_profit = current_value - holdings.total_investment;

    let cash_flows = build_cash_flows(records, current_value, calculation_date);
    let xirr = XirrDamper::adjusted_xirr(&cash_flows, calculation_date);

    InstrumentMetrics {
        total_investment: holdings.total_investment,
        current_value,
        profit: realized_profit + unrealized_profit,
        realized_profit,
        unrealized_profit,
        xirr,
        quantity: holdings.total_quantity,
    }
}
