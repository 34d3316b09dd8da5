use super::{Channel, ChannelState, Party};
use crate::{
    error::{ChannelError, Result},
    types::Address,
};

impl Channel {
    pub fn is_funded_by(&self, party: Party) -> bool {
        match party {
            Party::A => self.funded_a,
            Party::B => self.funded_b,
        }
    }

    /// Checks that `caller` may deposit into this channel and returns which
    /// party it is. Does not modify the channel.
    pub fn check_fundable(&self, caller: Address) -> Result<Party> {
        let party = self.party_of(caller)?;
        if self.is_funded_by(party) {
            return Err(ChannelError::AlreadyFunded(caller));
        }
        Ok(party)
    }

    /// The per-party deposit, which is what [Channel::check_fundable]'s
    /// caller has to move into custody.
    pub fn deposit(&self) -> u32 {
        self.deposit
    }

    /// Record `party`'s deposit. Only call once the tokens are in custody.
    pub(crate) fn mark_funded(&mut self, party: Party) -> ChannelState {
        debug_assert!(!self.is_funded_by(party));
        match party {
            Party::A => self.funded_a = true,
            Party::B => self.funded_b = true,
        }

        self.state = match (self.funded_a, self.funded_b) {
            (true, true) => ChannelState::Active,
            (true, false) => ChannelState::PartyAFunded,
            (false, true) => ChannelState::PartyBFunded,
            (false, false) => unreachable!("one party was just marked funded"),
        };
        self.state
    }
}
