//! Two-party payment channels with a dispute-window settlement.
//!
//! Both parties lock the same deposit, trade signed balance proposals off
//! the ledger, and finally let either of them submit the latest proposal the
//! other signed. After a fixed dispute window the escrow is paid out
//! according to the highest-nonce proposal seen.
//!
//! [ChannelManager] is the contract. It talks to the outside world through
//! three traits: [Verifier] for signature recovery, [Escrow] for token
//! custody and [Clock] for time.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod escrow;
mod manager;
pub mod sig;
pub mod types;
pub mod wire;

pub use channel::{BalanceProposal, ChannelDetails, ChannelState, Payout, SignedProposal};
pub use clock::{Clock, ManualClock};
pub use config::ManagerConfig;
pub use error::{ChannelError, ErrorKind, SignatureRejection};
pub use escrow::{Escrow, EscrowError, InMemoryEscrow};
pub use manager::ChannelManager;
pub use sig::{EthVerifier, Signer, Verifier};
pub use types::{Address, ChannelId, Hash, Signature};
