//! In-memory balance table
//!
//! Running balances per identity, the in-memory counterpart of the
//! `rfid_balances.csv` store. Unknown identities are registered at a
//! configured starting balance on first observation; balances are only
//! ever debited by a confirmed settlement.

use crate::core::traits::BalanceStore;
use crate::types::SettlementError;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// In-memory identity -> balance table
#[derive(Debug)]
pub struct MemoryBalances {
    balances: HashMap<String, Decimal>,
    starting_balance: Decimal,
}

impl MemoryBalances {
    /// Create an empty table with the given starting balance for new
    /// identities
    pub fn new(starting_balance: Decimal) -> Self {
        MemoryBalances {
            balances: HashMap::new(),
            starting_balance,
        }
    }

    /// Current balance without registering unknown identities
    pub fn get(&self, identity: &str) -> Option<Decimal> {
        self.balances.get(identity).copied()
    }
}

impl BalanceStore for MemoryBalances {
    fn balance_or_default(&mut self, identity: &str) -> Result<Decimal, SettlementError> {
        Ok(*self
            .balances
            .entry(identity.to_string())
            .or_insert(self.starting_balance))
    }

    fn debit(&mut self, identity: &str, amount: Decimal) -> Result<Decimal, SettlementError> {
        let balance = self.balances.get_mut(identity).ok_or_else(|| {
            SettlementError::storage(format!("no balance registered for '{}'", identity))
        })?;
        *balance -= amount;
        Ok(*balance)
    }
}
