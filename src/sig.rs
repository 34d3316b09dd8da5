//! Handles the creation and verification of (Ethereum) Signatures.
//!
//! The ledger contract only ever needs [Verifier]: given the digest of a
//! balance proposal and a signature it recovers the address that signed it.
//! [Signer] is used by the parties (and tests) to produce those signatures.

use crate::types::{Address, Hash, Signature};
use sha3::{Digest, Keccak256};

#[cfg(feature = "secp256k1")]
mod secp256k1;
#[cfg(feature = "secp256k1")]
pub use self::secp256k1::{recover_signer, Signer};

#[cfg(feature = "k256")]
#[cfg_attr(feature = "secp256k1", allow(dead_code))]
mod k256;
#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
pub use self::k256::{recover_signer, Signer};

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("paychan needs a signature backend: enable the `k256` or `secp256k1` feature");


/// Offset Ethereum adds to the recovery id.
const V_OFFSET: u8 = 27;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("recovery byte {0} is neither 27 nor 28")]
    InvalidRecoveryId(u8),
    #[error("malformed signature")]
    Malformed,
    #[error("no public key recovers from this signature")]
    Unrecoverable,
    #[error("signing failed")]
    Signing,
}

/// Recovers signer identities from digests. Implementations must be pure:
/// the same input always yields the same output.
pub trait Verifier {
    fn recover_signer(&self, digest: Hash, sig: Signature) -> Result<Address, Error>;
}

/// [Verifier] backed by the compiled-in ECDSA backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct EthVerifier;

impl Verifier for EthVerifier {
    fn recover_signer(&self, digest: Hash, sig: Signature) -> Result<Address, Error> {
        recover_signer(digest, sig)
    }
}

impl<V: Verifier + ?Sized> Verifier for &V {
    fn recover_signer(&self, digest: Hash, sig: Signature) -> Result<Address, Error> {
        (**self).recover_signer(digest, sig)
    }
}

/// Add the `\x19Ethereum Signed Message\n<length>` prefix to hash.
///
/// This is the format produced by `eth_sign` in the parties' wallets.
fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding => We can't use the serializer
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

/// Strip the Ethereum offset from `v`, leaving the raw recovery id.
fn recovery_id(sig: &Signature) -> Result<u8, Error> {
    match sig.v() {
        v @ (27 | 28) => Ok(v - V_OFFSET),
        v => Err(Error::InvalidRecoveryId(v)),
    }
}

/// Address of an uncompressed SEC1 public key (65 bytes, leading 0x04).
fn address_from_uncompressed(pk_bytes: &[u8; 65]) -> Address {
    // Throw away the first byte, which is not part of the public key. It is
    // added by the uncompressed encoding.
    let hash: [u8; 32] = Keccak256::digest(&pk_bytes[1..]).into();

    let mut addr = Address([0; 20]);
    addr.0.copy_from_slice(&hash[32 - 20..]);
    addr
}
