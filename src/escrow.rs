//! Custody of the escrowed tokens.
//!
//! The contract never touches token balances itself, it asks an [Escrow] to
//! pull deposits in and push payouts out. Both calls are all-or-nothing.

use alloc::collections::BTreeMap;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("{owner} approved {approved}, {required} required")]
    InsufficientAllowance {
        owner: Address,
        required: u64,
        approved: u64,
    },
    #[error("{owner} holds {available}, {required} required")]
    InsufficientBalance {
        owner: Address,
        required: u64,
        available: u64,
    },
    #[error("custody holds {held} of token {token}, {required} required")]
    InsufficientCustody {
        token: Address,
        required: u64,
        held: u64,
    },
    #[error("balance overflow")]
    Overflow,
}

pub trait Escrow {
    /// Move `amount` of `token` from `from` into custody.
    fn lock(&mut self, token: Address, from: Address, amount: u64) -> Result<(), EscrowError>;

    /// Pay every `(receiver, amount)` pair out of custody. Either all
    /// payouts happen or none does.
    fn release(&mut self, token: Address, payouts: &[(Address, u64)]) -> Result<(), EscrowError>;
}

impl<E: Escrow + ?Sized> Escrow for &mut E {
    fn lock(&mut self, token: Address, from: Address, amount: u64) -> Result<(), EscrowError> {
        (**self).lock(token, from, amount)
    }

    fn release(&mut self, token: Address, payouts: &[(Address, u64)]) -> Result<(), EscrowError> {
        (**self).release(token, payouts)
    }
}

/// In-memory token ledger with ERC20-like allowances.
///
/// Owners `approve` the escrow before funding; `lock` consumes the allowance.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEscrow {
    /// (token, owner) -> balance outside of custody.
    balances: BTreeMap<(Address, Address), u64>,
    /// (token, owner) -> amount the escrow may still pull.
    allowances: BTreeMap<(Address, Address), u64>,
    /// token -> amount in custody.
    custody: BTreeMap<Address, u64>,
}

impl InMemoryEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of freshly created tokens to `owner`.
    pub fn mint(&mut self, token: Address, owner: Address, amount: u64) -> Result<(), EscrowError> {
        let balance = self.balances.entry((token, owner)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(EscrowError::Overflow)?;
        Ok(())
    }

    /// Allow the escrow to pull up to `amount` from `owner`. Replaces any
    /// previous allowance.
    pub fn approve(&mut self, token: Address, owner: Address, amount: u64) {
        self.allowances.insert((token, owner), amount);
    }

    pub fn balance_of(&self, token: Address, owner: Address) -> u64 {
        self.balances.get(&(token, owner)).copied().unwrap_or(0)
    }

    pub fn allowance(&self, token: Address, owner: Address) -> u64 {
        self.allowances.get(&(token, owner)).copied().unwrap_or(0)
    }

    /// Total of `token` currently in custody, across all channels.
    pub fn held(&self, token: Address) -> u64 {
        self.custody.get(&token).copied().unwrap_or(0)
    }
}

impl Escrow for InMemoryEscrow {
    fn lock(&mut self, token: Address, from: Address, amount: u64) -> Result<(), EscrowError> {
        let approved = self.allowance(token, from);
        if approved < amount {
            return Err(EscrowError::InsufficientAllowance {
                owner: from,
                required: amount,
                approved,
            });
        }
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(EscrowError::InsufficientBalance {
                owner: from,
                required: amount,
                available,
            });
        }
        let held = self
            .held(token)
            .checked_add(amount)
            .ok_or(EscrowError::Overflow)?;

        // All checks passed, nothing below can fail.
        self.allowances.insert((token, from), approved - amount);
        self.balances.insert((token, from), available - amount);
        self.custody.insert(token, held);
        Ok(())
    }

    fn release(&mut self, token: Address, payouts: &[(Address, u64)]) -> Result<(), EscrowError> {
        let required = payouts
            .iter()
            .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(EscrowError::Overflow)?;
        let held = self.held(token);
        if held < required {
            return Err(EscrowError::InsufficientCustody {
                token,
                required,
                held,
            });
        }

        // Compute every new balance first so an overflow leaves no partial
        // payout behind.
        let mut credited = BTreeMap::new();
        for (receiver, amount) in payouts {
            let current = match credited.get(receiver) {
                Some(balance) => *balance,
                None => self.balance_of(token, *receiver),
            };
            let updated = current.checked_add(*amount).ok_or(EscrowError::Overflow)?;
            credited.insert(*receiver, updated);
        }

        for (receiver, balance) in credited {
            self.balances.insert((token, receiver), balance);
        }
        self.custody.insert(token, held - required);
        Ok(())
    }
}
