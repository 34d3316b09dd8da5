mod funding;
pub mod proposal;
mod registry;
mod settlement;
mod withdrawal;

use core::fmt::Display;

use serde::Serialize;

use crate::{
    error::{ChannelError, Result},
    types::{Address, ChannelId},
};

pub use proposal::{BalanceProposal, SignedProposal};
pub use registry::ChannelRegistry;
pub use withdrawal::Payout;

/// Lifecycle of a channel. Transitions only move down this list, except that
/// [ChannelState::PendingSettlement] may be re-entered with a newer proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Initialized,
    PartyAFunded,
    PartyBFunded,
    Active,
    PendingSettlement,
    Settled,
}

impl ChannelState {
    /// Integer code used by the ledger's read interface.
    pub fn code(self) -> u8 {
        match self {
            ChannelState::Initialized => 0,
            ChannelState::PartyAFunded => 1,
            ChannelState::PartyBFunded => 2,
            ChannelState::Active => 3,
            ChannelState::PendingSettlement => 4,
            ChannelState::Settled => 5,
        }
    }
}

impl TryFrom<u8> for ChannelState {
    type Error = u8;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        Ok(match code {
            0 => ChannelState::Initialized,
            1 => ChannelState::PartyAFunded,
            2 => ChannelState::PartyBFunded,
            3 => ChannelState::Active,
            4 => ChannelState::PendingSettlement,
            5 => ChannelState::Settled,
            other => return Err(other),
        })
    }
}

impl Display for ChannelState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ChannelState::Initialized => "initialized",
            ChannelState::PartyAFunded => "partyA_funded",
            ChannelState::PartyBFunded => "partyB_funded",
            ChannelState::Active => "active",
            ChannelState::PendingSettlement => "pending_settlement",
            ChannelState::Settled => "settled",
        })
    }
}

// Same names in JSON as in logs and error messages.
impl Serialize for ChannelState {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One of the two counterparties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    A,
    B,
}

impl Party {
    pub fn other(self) -> Self {
        match self {
            Party::A => Party::B,
            Party::B => Party::A,
        }
    }
}

/// A two-party channel as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    party_a: Address,
    party_b: Address,
    token: Address,
    deposit: u32,
    state: ChannelState,
    funded_a: bool,
    funded_b: bool,
    balance_a: u32,
    nonce: u32,
    settlement_deadline: Option<u64>,
}

impl Channel {
    /// A fresh, unfunded channel with an even split.
    ///
    /// Rejects identical parties and deposits whose doubled total does not
    /// fit the 4-byte balance field of a proposal.
    pub fn new(
        id: ChannelId,
        party_a: Address,
        party_b: Address,
        token: Address,
        deposit: u32,
    ) -> Result<Self> {
        if party_a == party_b {
            return Err(ChannelError::SameParties(party_a));
        }
        if deposit == 0 || deposit.checked_mul(2).is_none() {
            return Err(ChannelError::InvalidDeposit(deposit));
        }

        Ok(Channel {
            id,
            party_a,
            party_b,
            token,
            deposit,
            state: ChannelState::Initialized,
            funded_a: false,
            funded_b: false,
            balance_a: deposit,
            nonce: 0,
            settlement_deadline: None,
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }
    pub fn token(&self) -> Address {
        self.token
    }
    pub fn state(&self) -> ChannelState {
        self.state
    }
    pub fn balance_a(&self) -> u32 {
        self.balance_a
    }
    pub fn nonce(&self) -> u32 {
        self.nonce
    }
    pub fn settlement_deadline(&self) -> Option<u64> {
        self.settlement_deadline
    }

    /// Both deposits together. Cannot overflow, see [Channel::new].
    pub fn total(&self) -> u32 {
        self.deposit * 2
    }

    pub fn address_of(&self, party: Party) -> Address {
        match party {
            Party::A => self.party_a,
            Party::B => self.party_b,
        }
    }

    /// Which party `caller` is.
    pub fn party_of(&self, caller: Address) -> Result<Party> {
        if caller == self.party_a {
            Ok(Party::A)
        } else if caller == self.party_b {
            Ok(Party::B)
        } else {
            Err(ChannelError::PartyNotRecognized(caller))
        }
    }

    /// Amount of the token this channel currently has in custody.
    pub fn escrowed(&self) -> u64 {
        if self.state == ChannelState::Settled {
            return 0;
        }
        let deposits = u64::from(self.funded_a) + u64::from(self.funded_b);
        deposits * u64::from(self.deposit)
    }

    pub fn details(&self) -> ChannelDetails {
        ChannelDetails {
            party_a: self.party_a,
            party_b: self.party_b,
            token: self.token,
            deposit: self.deposit,
            state: self.state,
            balance_a: self.balance_a,
            nonce: self.nonce,
            settlement_deadline: self.settlement_deadline,
        }
    }
}

/// Read-only view of a channel, the source of truth for off-chain agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelDetails {
    pub party_a: Address,
    pub party_b: Address,
    pub token: Address,
    pub deposit: u32,
    pub state: ChannelState,
    pub balance_a: u32,
    pub nonce: u32,
    pub settlement_deadline: Option<u64>,
}

impl ChannelDetails {
    /// What party B would receive if the channel closed now.
    pub fn balance_b(&self) -> u32 {
        self.deposit.saturating_mul(2).saturating_sub(self.balance_a)
    }
}
