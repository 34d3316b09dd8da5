//! Errors returned by the channel contract.
//!
//! Every failing operation leaves the channel exactly as it was before the
//! call; the variant tells the caller why, [ErrorKind] how to react.

use crate::{
    channel::ChannelState,
    escrow::EscrowError,
    sig,
    types::{Address, ChannelId},
};

/// Coarse classification of [ChannelError]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or unknown / duplicate channel id.
    Validation,
    /// Caller is not a party, or the proposal is not signed by the required
    /// counterparty.
    Authorization,
    /// Operation is not valid in the channel's current state.
    State,
    /// Stale or duplicate submission.
    Replay,
    /// Moving escrowed tokens failed.
    Transfer,
}

/// Why a proposal's signature was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureRejection {
    #[error("{0}")]
    Unrecoverable(#[from] sig::Error),
    #[error("proposal is signed by its own submitter")]
    SelfSigned,
    #[error("proposal is signed by {0}, not by the counterparty")]
    NotCounterparty(Address),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel {0} already exists")]
    AlreadyExists(ChannelId),
    #[error("channel {0} does not exist")]
    NotFound(ChannelId),
    #[error("both parties are {0}")]
    SameParties(Address),
    #[error("deposit of {0} cannot be escrowed")]
    InvalidDeposit(u32),
    #[error("balance {balance_a} exceeds the escrowed total {total}")]
    BalanceOutOfRange { balance_a: u32, total: u32 },
    #[error("{0} is not a party of this channel")]
    PartyNotRecognized(Address),
    #[error("invalid signature: {0}")]
    InvalidSignature(SignatureRejection),
    #[error("operation not allowed in state {0}")]
    WrongState(ChannelState),
    #[error("settlement deadline {deadline} not reached (now {now})")]
    DeadlineNotReached { deadline: u64, now: u64 },
    #[error("dispute window closed at {deadline} (now {now})")]
    DisputeWindowClosed { deadline: u64, now: u64 },
    #[error("nonce {submitted} is not above the current nonce {current}")]
    StaleNonce { submitted: u32, current: u32 },
    #[error("{0} has already funded this channel")]
    AlreadyFunded(Address),
    #[error("escrow transfer failed: {0}")]
    TransferFailed(#[from] EscrowError),
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        use ChannelError::*;
        match self {
            AlreadyExists(_)
            | NotFound(_)
            | SameParties(_)
            | InvalidDeposit(_)
            | BalanceOutOfRange { .. } => ErrorKind::Validation,
            PartyNotRecognized(_) | InvalidSignature(_) => ErrorKind::Authorization,
            WrongState(_) | DeadlineNotReached { .. } | DisputeWindowClosed { .. } => {
                ErrorKind::State
            }
            StaleNonce { .. } | AlreadyFunded(_) => ErrorKind::Replay,
            TransferFailed(_) => ErrorKind::Transfer,
        }
    }
}

impl From<SignatureRejection> for ChannelError {
    fn from(e: SignatureRejection) -> Self {
        Self::InvalidSignature(e)
    }
}

pub type Result<T> = core::result::Result<T, ChannelError>;
