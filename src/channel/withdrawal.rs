use super::{Channel, ChannelState};
use crate::{
    error::{ChannelError, Result},
    types::Address,
};

/// Final distribution of a channel's escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub party_a: Address,
    pub amount_a: u64,
    pub party_b: Address,
    pub amount_b: u64,
}

impl Payout {
    pub fn total(&self) -> u64 {
        self.amount_a + self.amount_b
    }

    pub fn transfers(&self) -> [(Address, u64); 2] {
        [(self.party_a, self.amount_a), (self.party_b, self.amount_b)]
    }
}

impl Channel {
    /// The payout the last accepted proposal entitles the parties to, if the
    /// dispute window has passed. Does not modify the channel.
    pub fn payout(&self, now: u64) -> Result<Payout> {
        if self.state != ChannelState::PendingSettlement {
            return Err(ChannelError::WrongState(self.state));
        }
        // Entering PendingSettlement always sets the deadline.
        let deadline = self.settlement_deadline.unwrap_or(u64::MAX);
        if now < deadline {
            return Err(ChannelError::DeadlineNotReached { deadline, now });
        }

        Ok(Payout {
            party_a: self.party_a,
            amount_a: u64::from(self.balance_a),
            party_b: self.party_b,
            amount_b: u64::from(self.total() - self.balance_a),
        })
    }

    /// Terminal transition. Only call once the payout has been released.
    pub(crate) fn mark_settled(&mut self) {
        debug_assert_eq!(self.state, ChannelState::PendingSettlement);
        self.state = ChannelState::Settled;
    }
}
