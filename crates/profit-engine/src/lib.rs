//! Weighted-average cost-basis bookkeeping and profit allocation.
//!
//! One ledger = every transaction for one (platform, instrument) pair,
//! processed in (date, id) order. The allocator folds the ledger into a
//! running open cost/quantity and realizes profit on sells; the distributor
//! then apportions unrealized profit across the remaining open buy lots.

pub mod allocator;
pub mod distributor;
pub mod holdings;

pub use allocator::{CostBasisAllocator, LedgerAllocation};
pub use distributor::{
    calculate_instrument_profits, calculate_ledger_profits, effective_price, ProfitDistributor,
};
pub use holdings::*;
