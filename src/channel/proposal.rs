//! Balance proposals exchanged off-chain and submitted to the contract.
//!
//! The digest a party signs is the keccak256 hash of the packed encoding
//!
//! ```text
//! channel id (32 bytes) || nonce (4 bytes, BE) || balance A (4 bytes, BE) || submitter (20 bytes)
//! ```
//!
//! Field order and widths are part of the wire contract and must not change.
//! The submitter, not the signer, is the last field: a proposal signed for
//! Bob to submit cannot be submitted by anybody else.

use sha3::{Digest, Keccak256};

use crate::{
    sig::{self, Signer},
    types::{Address, ChannelId, Hash, Signature},
};

/// Length of the packed encoding that gets hashed.
pub const PACKED_LEN: usize = 32 + 4 + 4 + 20;

/// An unsigned (nonce, balance A) pair for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceProposal {
    pub channel_id: ChannelId,
    pub nonce: u32,
    pub balance_a: u32,
}

impl BalanceProposal {
    pub fn new(channel_id: ChannelId, nonce: u32, balance_a: u32) -> Self {
        Self {
            channel_id,
            nonce,
            balance_a,
        }
    }

    pub fn encode_packed(&self, submitter: Address) -> [u8; PACKED_LEN] {
        let mut buf = [0u8; PACKED_LEN];
        buf[..32].copy_from_slice(&self.channel_id.0);
        buf[32..36].copy_from_slice(&self.nonce.to_be_bytes());
        buf[36..40].copy_from_slice(&self.balance_a.to_be_bytes());
        buf[40..].copy_from_slice(&submitter.0);
        buf
    }

    /// Digest signed by the counterparty of `submitter`.
    pub fn digest(&self, submitter: Address) -> Hash {
        Hash(Keccak256::digest(self.encode_packed(submitter)).into())
    }

    /// Sign this proposal so that `submitter` (the other party) can put it
    /// on the ledger.
    pub fn sign(self, signer: &Signer, submitter: Address) -> Result<SignedProposal, sig::Error> {
        let sig = signer.sign_eth(self.digest(submitter))?;
        Ok(SignedProposal {
            proposal: self,
            sig,
        })
    }
}

/// A proposal together with the counterparty's signature, as relayed
/// between the parties and passed to `settle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedProposal {
    pub proposal: BalanceProposal,
    pub sig: Signature,
}
