use std::collections::BTreeMap;

use portfolio_core::{
    safe_div, RunningState, TransactionProfit, TransactionRecord, TransactionType,
};
use rust_decimal::Decimal;

/// Result of folding one ledger: the final open position plus per-transaction
/// derived figures keyed by transaction id. Records are never mutated.
#[derive(Debug, Clone, Default)]
pub struct LedgerAllocation {
    pub state: RunningState,
    pub per_transaction: BTreeMap<i64, TransactionProfit>,
}

impl LedgerAllocation {
    /// Average open cost per unit, zero when the position is closed.
    pub fn average_cost(&self) -> Decimal {
        average_cost(self.state.total_cost, self.state.current_quantity)
    }

    /// Sum of realized profit across all sell transactions.
    pub fn realized_profit(&self) -> Decimal {
        self.per_transaction
            .values()
            .map(|p| p.realized_profit)
            .sum()
    }
}

/// `total_cost / quantity` when both are positive, zero otherwise.
/// Never NaN, never a division panic.
pub fn average_cost(total_cost: Decimal, quantity: Decimal) -> Decimal {
    if total_cost > Decimal::ZERO && quantity > Decimal::ZERO {
        safe_div(total_cost, quantity)
    } else {
        Decimal::ZERO
    }
}

/// Folds a ledger's ordered buy/sell events into running cost and quantity,
/// realizing profit against the weighted-average cost on each sell.
pub struct CostBasisAllocator;

impl CostBasisAllocator {
    /// Process one ledger. Input order does not matter; the allocator sorts
    /// by (date, id) internally, so the result is deterministic for a fixed
    /// set of records.
    pub fn allocate(ledger: &[TransactionRecord]) -> LedgerAllocation {
        let mut ordered: Vec<&TransactionRecord> = ledger.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let mut allocation = LedgerAllocation::default();
        for tx in ordered {
            let state = allocation.state;
            allocation.state = match tx.tx_type {
                TransactionType::Buy => Self::apply_buy(tx, state, &mut allocation),
                TransactionType::Sell => Self::apply_sell(tx, state, &mut allocation),
            };
        }
        allocation
    }

    fn apply_buy(
        tx: &TransactionRecord,
        state: RunningState,
        allocation: &mut LedgerAllocation,
    ) -> RunningState {
        let cost = tx.price * tx.quantity + tx.commission;
        allocation.per_transaction.insert(
            tx.id,
            TransactionProfit {
                realized_profit: Decimal::ZERO,
                ..Default::default()
            },
        );
        RunningState {
            total_cost: state.total_cost + cost,
            current_quantity: state.current_quantity + tx.quantity,
        }
    }

    fn apply_sell(
        tx: &TransactionRecord,
        state: RunningState,
        allocation: &mut LedgerAllocation,
    ) -> RunningState {
        // Selling into an empty or negative position: zeroed metrics for the
        // event, state passes through unchanged.
        if state.current_quantity <= Decimal::ZERO {
            tracing::warn!(
                tx_id = tx.id,
                "sell against empty position, zeroing metrics"
            );
            allocation
                .per_transaction
                .insert(tx.id, TransactionProfit::default());
            return state;
        }
        // An oversized sell is capped at the open quantity: profit is only
        // realized on units actually held, and the running state never goes
        // negative.
        let effective_quantity = tx.quantity.min(state.current_quantity);
        let avg = average_cost(state.total_cost, state.current_quantity);
        allocation.per_transaction.insert(
            tx.id,
            TransactionProfit {
                average_cost: avg,
                realized_profit: effective_quantity * (tx.price - avg) - tx.commission,
                unrealized_profit: Decimal::ZERO,
                remaining_quantity: Decimal::ZERO,
            },
        );
        let sell_ratio = safe_div(effective_quantity, state.current_quantity);
        RunningState {
            total_cost: state.total_cost * (Decimal::ONE - sell_ratio),
            current_quantity: state.current_quantity - effective_quantity,
        }
    }
}
