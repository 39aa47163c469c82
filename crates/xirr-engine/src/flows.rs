use chrono::NaiveDate;
use portfolio_core::{CashFlow, TransactionRecord, TransactionType};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// The signed cash flow a transaction represents: buys cost money
/// (commission included), sells return it (commission deducted).
pub fn cash_flow_for(tx: &TransactionRecord) -> CashFlow {
    let amount = match tx.tx_type {
        TransactionType::Buy => -(tx.price * tx.quantity + tx.commission),
        TransactionType::Sell => tx.price * tx.quantity - tx.commission,
    };
    CashFlow::new(amount.to_f64().unwrap_or(0.0), tx.date)
}

/// Cash-flow series for an XIRR calculation: one flow per transaction plus,
/// when the position is still worth something, a synthetic inflow of the
/// current value at the calculation date.
pub fn build_cash_flows(
    records: &[TransactionRecord],
    current_value: Decimal,
    calculation_date: NaiveDate,
) -> Vec<CashFlow> {
    let mut flows: Vec<CashFlow> = records.iter().map(cash_flow_for).collect();
    if current_value > Decimal::ZERO {
        flows.push(CashFlow::new(
            current_value.to_f64().unwrap_or(0.0),
            calculation_date,
        ));
    }
    flows
}
