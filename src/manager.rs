use tracing::{debug, info};

use crate::{
    channel::{
        BalanceProposal, Channel, ChannelDetails, ChannelRegistry, ChannelState, Payout,
        SignedProposal,
    },
    clock::Clock,
    config::{ConfigError, ManagerConfig},
    error::{ChannelError, Result, SignatureRejection},
    escrow::Escrow,
    sig::Verifier,
    types::{Address, ChannelId, Signature},
};

/// The channel contract: owns every channel and exposes the operations the
/// ledger executes on behalf of its callers.
///
/// Each method is one atomic step. All checks run before anything is
/// written, and the only external effect (moving tokens through the
/// [Escrow]) happens last-but-one, so a failure at any point leaves the
/// channel exactly as it was. The host ledger serializes calls, hence
/// `&mut self`.
///
/// `caller` is the authenticated sender of the ledger transaction.
#[derive(Debug)]
pub struct ChannelManager<V: Verifier, E: Escrow, C: Clock> {
    registry: ChannelRegistry,
    verifier: V,
    escrow: E,
    clock: C,
    config: ManagerConfig,
}

impl<V: Verifier, E: Escrow, C: Clock> ChannelManager<V, E, C> {
    /// Creates a new [ChannelManager] with no channels.
    pub fn new(
        verifier: V,
        escrow: E,
        clock: C,
        config: ManagerConfig,
    ) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(ChannelManager {
            registry: ChannelRegistry::new(),
            verifier,
            escrow,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn escrow(&self) -> &E {
        &self.escrow
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Register a new, unfunded channel. No tokens move.
    pub fn create(
        &mut self,
        id: ChannelId,
        party_a: Address,
        party_b: Address,
        token: Address,
        deposit: u32,
    ) -> Result<()> {
        let channel = Channel::new(id, party_a, party_b, token, deposit)
            .and_then(|channel| self.registry.insert(channel).map(|_| ()));
        match channel {
            Ok(()) => {
                info!(channel = %id, %party_a, %party_b, %token, deposit, "channel created");
                Ok(())
            }
            Err(e) => {
                debug!(channel = %id, error = %e, "create rejected");
                Err(e)
            }
        }
    }

    /// Move `caller`'s deposit into custody. Returns the new state.
    pub fn fund(&mut self, caller: Address, id: ChannelId) -> Result<ChannelState> {
        let channel = self.registry.get_mut(&id)?;
        let party = channel.check_fundable(caller).map_err(|e| {
            debug!(channel = %id, %caller, error = %e, "fund rejected");
            e
        })?;

        self.escrow
            .lock(channel.token(), caller, u64::from(channel.deposit()))
            .map_err(|e| {
                debug!(channel = %id, %caller, error = %e, "deposit transfer failed");
                ChannelError::TransferFailed(e)
            })?;

        let state = channel.mark_funded(party);
        info!(channel = %id, %caller, %state, "channel funded");
        Ok(state)
    }

    /// Accept a balance proposal signed by `caller`'s counterparty.
    pub fn settle(
        &mut self,
        caller: Address,
        id: ChannelId,
        nonce: u32,
        balance_a: u32,
        sig: Signature,
    ) -> Result<()> {
        let now = self.clock.now();
        let channel = self.registry.get_mut(&id)?;
        let proposal = BalanceProposal::new(id, nonce, balance_a);

        let checked = channel.check_proposal(caller, &proposal, now).and_then(|submitter| {
            let signer = self
                .verifier
                .recover_signer(proposal.digest(caller), sig)
                .map_err(SignatureRejection::from)?;
            channel.check_signer(submitter, signer)
        });
        if let Err(e) = checked {
            debug!(channel = %id, %caller, nonce, error = %e, "settlement rejected");
            return Err(e);
        }

        let deadline = channel.apply_proposal(&proposal, now, self.config.dispute_window);
        info!(channel = %id, %caller, nonce, balance_a, deadline, "settlement accepted");
        Ok(())
    }

    /// [ChannelManager::settle] with a proposal received over the relay.
    pub fn submit(&mut self, caller: Address, signed: SignedProposal) -> Result<()> {
        let SignedProposal { proposal, sig } = signed;
        self.settle(
            caller,
            proposal.channel_id,
            proposal.nonce,
            proposal.balance_a,
            sig,
        )
    }

    /// Pay out the last accepted settlement once the dispute window is over.
    /// Anybody may call this, the outcome does not depend on the caller.
    pub fn withdraw(&mut self, id: ChannelId) -> Result<Payout> {
        let now = self.clock.now();
        let channel = self.registry.get_mut(&id)?;
        let payout = channel.payout(now).map_err(|e| {
            debug!(channel = %id, error = %e, "withdraw rejected");
            e
        })?;

        self.escrow
            .release(channel.token(), &payout.transfers())
            .map_err(|e| {
                debug!(channel = %id, error = %e, "payout transfer failed");
                ChannelError::TransferFailed(e)
            })?;

        channel.mark_settled();
        info!(
            channel = %id,
            amount_a = payout.amount_a,
            amount_b = payout.amount_b,
            "channel settled"
        );
        Ok(payout)
    }

    pub fn details(&self, id: ChannelId) -> Result<ChannelDetails> {
        self.registry.get(&id).map(Channel::details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        error::ErrorKind,
        escrow::{EscrowError, InMemoryEscrow},
        sig::{EthVerifier, Signer},
        types::Hash,
    };
    use rand::{rngs::StdRng, SeedableRng};

    const ID: ChannelId = Hash([0x01; 32]);
    const TOKEN: Address = Address([0xee; 20]);
    const DEPOSIT: u32 = 20;

    struct Fixture {
        alice: Signer,
        bob: Signer,
        clock: ManualClock,
    }

    type Manager<'a> = ChannelManager<EthVerifier, InMemoryEscrow, &'a ManualClock>;

    impl Fixture {
        fn new() -> Self {
            // Do not use that on any real device, this is just for testing.
            let mut rng = StdRng::seed_from_u64(0);
            Fixture {
                alice: Signer::new(&mut rng),
                bob: Signer::new(&mut rng),
                clock: ManualClock::new(0),
            }
        }

        fn a(&self) -> Address {
            self.alice.address()
        }

        fn b(&self) -> Address {
            self.bob.address()
        }

        fn manager(&self) -> Manager<'_> {
            let mut escrow = InMemoryEscrow::new();
            for party in [self.a(), self.b()] {
                escrow.mint(TOKEN, party, 1000).unwrap();
                escrow.approve(TOKEN, party, u64::from(DEPOSIT));
            }
            let mut mgr =
                ChannelManager::new(EthVerifier, escrow, &self.clock, ManagerConfig::default())
                    .unwrap();
            mgr.create(ID, self.a(), self.b(), TOKEN, DEPOSIT).unwrap();
            mgr
        }

        fn active_manager(&self) -> Manager<'_> {
            let mut mgr = self.manager();
            mgr.fund(self.a(), ID).unwrap();
            mgr.fund(self.b(), ID).unwrap();
            mgr
        }

        /// `signer` authorizes `submitter` to put (nonce, balance_a) on-chain.
        fn signed(
            &self,
            signer: &Signer,
            submitter: Address,
            nonce: u32,
            balance_a: u32,
        ) -> Signature {
            BalanceProposal::new(ID, nonce, balance_a)
                .sign(signer, submitter)
                .unwrap()
                .sig
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let clock = ManualClock::new(0);
        let result = ChannelManager::new(
            EthVerifier,
            InMemoryEscrow::new(),
            &clock,
            ManagerConfig::default().with_dispute_window(0),
        );
        assert!(matches!(result, Err(ConfigError::EmptyDisputeWindow)));
    }

    #[test]
    fn duplicate_create_fails() {
        let f = Fixture::new();
        let mut mgr = f.manager();
        let err = mgr.create(ID, f.b(), f.a(), TOKEN, 5).unwrap_err();
        assert_eq!(err, ChannelError::AlreadyExists(ID));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mgr.details(ID).unwrap().party_a, f.a());
    }

    #[test]
    fn funding_moves_deposits_into_custody() {
        let f = Fixture::new();
        let mut mgr = f.manager();

        assert_eq!(mgr.fund(f.a(), ID), Ok(ChannelState::PartyAFunded));
        assert_eq!(mgr.escrow().held(TOKEN), 20);
        assert_eq!(mgr.fund(f.b(), ID), Ok(ChannelState::Active));
        assert_eq!(mgr.escrow().held(TOKEN), 40);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.a()), 980);
        assert_eq!(mgr.registry().get(&ID).unwrap().escrowed(), 40);
    }

    #[test]
    fn failed_transfer_sets_no_flag() {
        let f = Fixture::new();
        let mut escrow = InMemoryEscrow::new();
        escrow.mint(TOKEN, f.a(), 1000).unwrap();
        let mut mgr =
            ChannelManager::new(EthVerifier, escrow, &f.clock, ManagerConfig::default()).unwrap();
        mgr.create(ID, f.a(), f.b(), TOKEN, DEPOSIT).unwrap();

        // No approval given.
        let err = mgr.fund(f.a(), ID).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::TransferFailed(EscrowError::InsufficientAllowance { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(mgr.details(ID).unwrap().state, ChannelState::Initialized);
        assert!(!mgr.registry().get(&ID).unwrap().is_funded_by(crate::channel::Party::A));
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.a()), 1000);
    }

    #[test]
    fn settle_rejects_self_signed_proposal() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();

        let sig = f.signed(&f.alice, f.a(), 1, 40);
        assert_eq!(
            mgr.settle(f.a(), ID, 1, 40, sig),
            Err(ChannelError::InvalidSignature(SignatureRejection::SelfSigned))
        );
        assert_eq!(mgr.details(ID).unwrap().state, ChannelState::Active);
    }

    #[test]
    fn proposal_cannot_be_replayed_by_another_submitter() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();

        // Signed for Bob to submit. Submitted by Alice the digest differs,
        // so the signature recovers to some unrelated key.
        let sig = f.signed(&f.alice, f.b(), 1, 0);
        let err = mgr.settle(f.a(), ID, 1, 0, sig).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        mgr.settle(f.b(), ID, 1, 0, sig).unwrap();
        assert_eq!(mgr.details(ID).unwrap().balance_a, 0);
    }

    #[test]
    fn stale_nonce_fails_before_signature_check() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();
        mgr.settle(f.a(), ID, 2, 10, f.signed(&f.bob, f.a(), 2, 10))
            .unwrap();

        // Garbage signature, but the nonce is what gets reported.
        let err = mgr
            .settle(f.b(), ID, 2, 30, Signature::default())
            .unwrap_err();
        assert_eq!(
            err,
            ChannelError::StaleNonce {
                submitted: 2,
                current: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::Replay);
    }

    #[test]
    fn malformed_signature_is_an_authorization_error() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();
        let err = mgr
            .settle(f.a(), ID, 1, 10, Signature::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::InvalidSignature(SignatureRejection::Unrecoverable(_))
        ));
    }

    #[test]
    fn highest_nonce_wins_and_deadline_is_fixed() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();

        f.clock.advance(5);
        mgr.settle(f.a(), ID, 1, 30, f.signed(&f.bob, f.a(), 1, 30))
            .unwrap();
        assert_eq!(mgr.details(ID).unwrap().settlement_deadline, Some(15));

        f.clock.advance(4);
        mgr.settle(f.b(), ID, 3, 6, f.signed(&f.alice, f.b(), 3, 6))
            .unwrap();

        let details = mgr.details(ID).unwrap();
        assert_eq!(details.state, ChannelState::PendingSettlement);
        assert_eq!((details.balance_a, details.nonce), (6, 3));
        assert_eq!(details.settlement_deadline, Some(15));

        // The older proposal arriving late changes nothing.
        let late = f.signed(&f.bob, f.a(), 1, 30);
        assert!(mgr.settle(f.a(), ID, 1, 30, late).is_err());
        assert_eq!(mgr.details(ID).unwrap().nonce, 3);
    }

    #[test]
    fn withdraw_waits_for_deadline_then_pays_once() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();
        mgr.settle(f.b(), ID, 3, 6, f.signed(&f.alice, f.b(), 3, 6))
            .unwrap();

        let err = mgr.withdraw(ID).unwrap_err();
        assert_eq!(
            err,
            ChannelError::DeadlineNotReached {
                deadline: 10,
                now: 0
            }
        );

        f.clock.advance(10);
        let payout = mgr.withdraw(ID).unwrap();
        assert_eq!(payout.total(), 40);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.a()), 986);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.b()), 1014);
        assert_eq!(mgr.escrow().held(TOKEN), 0);
        assert_eq!(mgr.details(ID).unwrap().state, ChannelState::Settled);

        assert_eq!(
            mgr.withdraw(ID),
            Err(ChannelError::WrongState(ChannelState::Settled))
        );
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.a()), 986);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.b()), 1014);
    }

    #[test]
    fn settle_after_deadline_is_refused() {
        let f = Fixture::new();
        let mut mgr = f.active_manager();
        mgr.settle(f.a(), ID, 1, 30, f.signed(&f.bob, f.a(), 1, 30))
            .unwrap();

        f.clock.advance(10);
        let err = mgr
            .settle(f.b(), ID, 2, 5, f.signed(&f.alice, f.b(), 2, 5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(mgr.details(ID).unwrap().balance_a, 30);
    }

    #[test]
    fn failed_payout_keeps_the_channel_pending() {
        let f = Fixture::new();
        let mut escrow = InMemoryEscrow::new();
        escrow.mint(TOKEN, f.a(), u64::MAX).unwrap();
        escrow.mint(TOKEN, f.b(), 1000).unwrap();
        for party in [f.a(), f.b()] {
            escrow.approve(TOKEN, party, u64::from(DEPOSIT));
        }
        let mut mgr =
            ChannelManager::new(EthVerifier, escrow, &f.clock, ManagerConfig::default()).unwrap();
        mgr.create(ID, f.a(), f.b(), TOKEN, DEPOSIT).unwrap();
        mgr.fund(f.a(), ID).unwrap();
        mgr.fund(f.b(), ID).unwrap();
        mgr.settle(f.b(), ID, 1, 40, f.signed(&f.alice, f.b(), 1, 40))
            .unwrap();
        f.clock.advance(10);

        // Crediting 40 to Alice overflows her balance.
        let err = mgr.withdraw(ID).unwrap_err();
        assert_eq!(err, ChannelError::TransferFailed(EscrowError::Overflow));
        assert_eq!(err.kind(), ErrorKind::Transfer);

        let details = mgr.details(ID).unwrap();
        assert_eq!(details.state, ChannelState::PendingSettlement);
        assert_eq!((details.nonce, details.balance_a), (1, 40));
        assert_eq!(mgr.escrow().held(TOKEN), 40);
        assert_eq!(mgr.registry().get(&ID).unwrap().escrowed(), 40);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.a()), u64::MAX - 20);
        assert_eq!(mgr.escrow().balance_of(TOKEN, f.b()), 980);

        // Still withdrawable later, still failing the same way.
        assert_eq!(mgr.withdraw(ID), Err(err));
        assert_eq!(mgr.escrow().held(TOKEN), 40);
    }

    #[test]
    fn unknown_channel_is_not_found() {
        let f = Fixture::new();
        let mut mgr = f.manager();
        let other = Hash([0x02; 32]);
        assert_eq!(mgr.details(other), Err(ChannelError::NotFound(other)));
        assert_eq!(mgr.fund(f.a(), other), Err(ChannelError::NotFound(other)));
        assert_eq!(mgr.withdraw(other), Err(ChannelError::NotFound(other)));
    }
}
