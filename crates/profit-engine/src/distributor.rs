use portfolio_core::{safe_div, TransactionProfit, TransactionRecord};
use rust_decimal::Decimal;

use crate::allocator::{CostBasisAllocator, LedgerAllocation};

/// Apportions the ledger's open position and unrealized profit across its
/// BUY transactions, proportionally to each lot's bought quantity.
///
/// The reference cost for a lot's unrealized profit is the lot's own buy
/// price, applied uniformly to open and closed positions alike.
pub struct ProfitDistributor;

impl ProfitDistributor {
    pub fn distribute(
        ledger: &[TransactionRecord],
        allocation: &mut LedgerAllocation,
        effective_price: Decimal,
    ) {
        let buys: Vec<&TransactionRecord> = ledger.iter().filter(|tx| tx.is_buy()).collect();
        let current_quantity = allocation.state.current_quantity;

        if current_quantity <= Decimal::ZERO {
            for buy in buys {
                allocation.per_transaction.insert(
                    buy.id,
                    TransactionProfit {
                        average_cost: buy.price,
                        realized_profit: Decimal::ZERO,
                        unrealized_profit: Decimal::ZERO,
                        remaining_quantity: Decimal::ZERO,
                    },
                );
            }
            return;
        }

        let total_buy_quantity: Decimal = buys.iter().map(|b| b.quantity).sum();
        if total_buy_quantity <= Decimal::ZERO {
            return;
        }

        for buy in buys {
            let proportional_quantity =
                safe_div(buy.quantity * current_quantity, total_buy_quantity);
            let unrealized_profit = if effective_price > Decimal::ZERO {
                proportional_quantity * (effective_price - buy.price)
            } else {
                Decimal::ZERO
            };
            allocation.per_transaction.insert(
                buy.id,
                TransactionProfit {
                    average_cost: buy.price,
                    realized_profit: Decimal::ZERO,
                    unrealized_profit,
                    remaining_quantity: proportional_quantity,
                },
            );
        }
    }
}

/// Resolve the price used for unrealized profit: the caller-supplied price
/// when positive, else the instrument's last known price, else zero.
pub fn effective_price(current_price: Decimal, fallback_price: Option<Decimal>) -> Decimal {
    if current_price > Decimal::ZERO {
        current_price
    } else {
        fallback_price
            .filter(|p| *p > Decimal::ZERO)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Full profit pass for one ledger: allocate cost basis in (date, id) order,
/// then distribute unrealized profit across the open buy lots.
pub fn calculate_ledger_profits(
    ledger: &[TransactionRecord],
    current_price: Decimal,
    fallback_price: Option<Decimal>,
) -> LedgerAllocation {
    let mut allocation = CostBasisAllocator::allocate(ledger);
    let price = effective_price(current_price, fallback_price);
    ProfitDistributor::distribute(ledger, &mut allocation, price);
    allocation
}

/// Profit pass for every ledger of one instrument: records are grouped by
/// platform, each platform ledger is allocated and distributed on its own,
/// and the per-transaction results are merged into a single map.
pub fn calculate_instrument_profits(
    records: &[TransactionRecord],
    current_price: Decimal,
    fallback_price: Option<Decimal>,
) -> std::collections::BTreeMap<i64, TransactionProfit> {
    let mut groups: std::collections::BTreeMap<portfolio_core::Platform, Vec<TransactionRecord>> =
        std::collections::BTreeMap::new();
    for record in records {
        groups.entry(record.platform).or_default().push(record.clone());
    }
    let mut merged = std::collections::BTreeMap::new();
    for ledger in groups.values() {
        let allocation = calculate_ledger_profits(ledger, current_price, fallback_price);
        merged.extend(allocation.per_transaction);
    }
    merged
}
