//! Payment settlement: the PENDING/OVERDUE→PAID state machine.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::payment_router;
pub use service::{RepeatSettlementPolicy, SettlementError, SettlementService};
