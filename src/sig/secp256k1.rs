//! Signer using the secp256k1 crate (bindings to libsecp256k1).

use crate::types::{Address, Hash, Signature};
use secp256k1::{
    self,
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1, SecretKey,
};

use super::{address_from_uncompressed, hash_to_eth_signed_msg_hash, recovery_id, Error, V_OFFSET};

impl From<PublicKey> for Address {
    fn from(pk: PublicKey) -> Self {
        address_from_uncompressed(&pk.serialize_uncompressed())
    }
}

#[derive(Debug)]
pub struct Signer {
    key: SecretKey,
    addr: Address,
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let secp = Secp256k1::signing_only();
        let key = SecretKey::new(rng);
        let addr = PublicKey::from_secret_key(&secp, &key).into();
        Self { key, addr }
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign a hash using a Ethereum 65-byte recoverable signature.
    ///
    /// Note that this differs from transaction signatures, as it does not
    /// include the length.
    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        let secp = Secp256k1::signing_only();

        // "\x19Ethereum Signed Message:\n32" format
        let hash = hash_to_eth_signed_msg_hash(msg);

        // Recoverable, so the contract can get the address back. This gives
        // us the additional information needed for v.
        let sig = secp.sign_ecdsa_recoverable(&Message::from(hash), &self.key);
        let (v, rs) = sig.serialize_compact();

        // EIP-2 rejects signatures with a high s. libsecp256k1 already
        // produces canonical ones; fail early if that ever changes.
        debug_assert!(rs[32] & 0x80 == 0);

        let v = u8::try_from(v.to_i32()).map_err(|_| Error::Signing)?;
        Ok(Signature::new(&rs, V_OFFSET + v))
    }
}

/// Recover the address that produced `eth_sig` over `msg`.
///
/// `msg` is the digest given to [Signer::sign_eth()], without the
/// `Ethereum Signed Message` prefix.
pub fn recover_signer(msg: Hash, eth_sig: Signature) -> Result<Address, Error> {
    let secp = Secp256k1::verification_only();
    let hash = hash_to_eth_signed_msg_hash(msg);

    let recid =
        RecoveryId::from_i32(recovery_id(&eth_sig)?.into()).map_err(|_| Error::Malformed)?;
    let sig =
        RecoverableSignature::from_compact(eth_sig.rs(), recid).map_err(|_| Error::Malformed)?;

    let pk = secp
        .recover_ecdsa(&Message::from(hash), &sig)
        .map_err(|_| Error::Unrecoverable)?;

    Ok(pk.into())
}
