//! Dispute-window settlement.
//!
//! Either party may submit the latest balance proposal signed by the other.
//! The first accepted proposal opens the dispute window; until it closes a
//! proposal with a higher nonce replaces the stored one. The window is never
//! extended, so a dispute cannot be dragged out by a stream of counter
//! proposals.

use super::{BalanceProposal, Channel, ChannelState, Party};
use crate::{
    error::{ChannelError, Result, SignatureRejection},
    types::Address,
};

impl Channel {
    /// Checks everything about a proposal that does not need the signature:
    /// state, dispute window, caller, nonce and balance range. Returns the
    /// caller's party. Does not modify the channel.
    pub fn check_proposal(
        &self,
        caller: Address,
        proposal: &BalanceProposal,
        now: u64,
    ) -> Result<Party> {
        debug_assert_eq!(proposal.channel_id, self.id);

        match self.state {
            ChannelState::Active => {}
            ChannelState::PendingSettlement => {
                if let Some(deadline) = self.settlement_deadline {
                    if now >= deadline {
                        return Err(ChannelError::DisputeWindowClosed { deadline, now });
                    }
                }
            }
            ChannelState::Initialized
            | ChannelState::PartyAFunded
            | ChannelState::PartyBFunded
            | ChannelState::Settled => return Err(ChannelError::WrongState(self.state)),
        }

        let submitter = self.party_of(caller)?;

        if proposal.nonce <= self.nonce {
            return Err(ChannelError::StaleNonce {
                submitted: proposal.nonce,
                current: self.nonce,
            });
        }
        if proposal.balance_a > self.total() {
            return Err(ChannelError::BalanceOutOfRange {
                balance_a: proposal.balance_a,
                total: self.total(),
            });
        }

        Ok(submitter)
    }

    /// The recovered `signer` must be the submitter's counterparty. A
    /// proposal signed by its own submitter proves nothing about the other
    /// side's consent.
    pub fn check_signer(&self, submitter: Party, signer: Address) -> Result<()> {
        if signer == self.address_of(submitter) {
            return Err(SignatureRejection::SelfSigned.into());
        }
        if signer != self.address_of(submitter.other()) {
            return Err(SignatureRejection::NotCounterparty(signer).into());
        }
        Ok(())
    }

    /// Store an already validated proposal. Opens the dispute window on the
    /// first call and returns the (unchanged afterwards) deadline.
    pub(crate) fn apply_proposal(
        &mut self,
        proposal: &BalanceProposal,
        now: u64,
        dispute_window: u64,
    ) -> u64 {
        debug_assert!(proposal.nonce > self.nonce);
        debug_assert!(proposal.balance_a <= self.total());

        self.balance_a = proposal.balance_a;
        self.nonce = proposal.nonce;
        self.state = ChannelState::PendingSettlement;
        *self
            .settlement_deadline
            .get_or_insert_with(|| now.saturating_add(dispute_window))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    fn prop(nonce: u32, balance_a: u32) -> BalanceProposal {
        BalanceProposal::new(ID, nonce, balance_a)
    }

    #[test]
    fn unfunded_channel_cannot_settle() {
        let mut ch = channel(20);
        assert_eq!(
            ch.check_proposal(ALICE, &prop(1, 5), 0),
            Err(ChannelError::WrongState(ChannelState::Initialized))
        );
        ch.mark_funded(Party::A);
        assert_eq!(
            ch.check_proposal(ALICE, &prop(1, 5), 0),
            Err(ChannelError::WrongState(ChannelState::PartyAFunded))
        );
    }

    #[test]
    fn first_proposal_opens_the_window() {
        let mut ch = active(20);
        assert_eq!(ch.check_proposal(ALICE, &prop(1, 15), 100), Ok(Party::A));

        let deadline = ch.apply_proposal(&prop(1, 15), 100, 10);
        assert_eq!(deadline, 110);
        assert_eq!(ch.state(), ChannelState::PendingSettlement);
        assert_eq!(ch.balance_a(), 15);
        assert_eq!(ch.nonce(), 1);
    }

    #[test]
    fn later_proposals_keep_the_deadline() {
        let mut ch = active(20);
        ch.apply_proposal(&prop(1, 15), 100, 10);

        assert_eq!(ch.check_proposal(BOB, &prop(4, 2), 105), Ok(Party::B));
        assert_eq!(ch.apply_proposal(&prop(4, 2), 105, 10), 110);
        assert_eq!(ch.settlement_deadline(), Some(110));
        assert_eq!(ch.nonce(), 4);
        assert_eq!(ch.balance_a(), 2);
    }

    #[test]
    fn stale_and_duplicate_nonces_are_rejected() {
        let mut ch = active(20);
        assert_eq!(
            ch.check_proposal(ALICE, &prop(0, 20), 0),
            Err(ChannelError::StaleNonce {
                submitted: 0,
                current: 0
            })
        );

        ch.apply_proposal(&prop(3, 6), 0, 10);
        for nonce in [1, 2, 3] {
            assert_eq!(
                ch.check_proposal(BOB, &prop(nonce, 6), 1),
                Err(ChannelError::StaleNonce {
                    submitted: nonce,
                    current: 3
                })
            );
        }
    }

    #[test]
    fn balance_must_fit_the_escrow() {
        let ch = active(20);
        assert_eq!(ch.check_proposal(ALICE, &prop(1, 40), 0), Ok(Party::A));
        assert_eq!(
            ch.check_proposal(ALICE, &prop(1, 41), 0),
            Err(ChannelError::BalanceOutOfRange {
                balance_a: 41,
                total: 40
            })
        );
    }

    #[test]
    fn window_closes_at_the_deadline() {
        let mut ch = active(20);
        ch.apply_proposal(&prop(1, 15), 0, 10);
        assert!(ch.check_proposal(BOB, &prop(2, 10), 9).is_ok());
        assert_eq!(
            ch.check_proposal(BOB, &prop(2, 10), 10),
            Err(ChannelError::DisputeWindowClosed {
                deadline: 10,
                now: 10
            })
        );
    }

    #[test]
    fn strangers_cannot_submit() {
        let ch = active(20);
        assert_eq!(
            ch.check_proposal(MALLORY, &prop(1, 15), 0),
            Err(ChannelError::PartyNotRecognized(MALLORY))
        );
    }

    #[test]
    fn signer_must_be_the_counterparty() {
        let ch = active(20);
        assert_eq!(ch.check_signer(Party::A, BOB), Ok(()));
        assert_eq!(ch.check_signer(Party::B, ALICE), Ok(()));
        assert_eq!(
            ch.check_signer(Party::A, ALICE),
            Err(ChannelError::InvalidSignature(SignatureRejection::SelfSigned))
        );
        assert_eq!(
            ch.check_signer(Party::B, MALLORY),
            Err(ChannelError::InvalidSignature(
                SignatureRejection::NotCounterparty(MALLORY)
            ))
        );
    }

    #[test]
    fn deadline_saturates() {
        let mut ch = active(20);
        assert_eq!(ch.apply_proposal(&prop(1, 1), u64::MAX - 1, 10), u64::MAX);
    }
}
