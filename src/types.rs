//! Fixed-width byte types shared by the ledger contract and its off-chain
//! counterparts.

use core::fmt::{Debug, Display};

use rand::{distributions::Standard, prelude::Distribution};
use serde::Serialize;

#[cfg(feature = "secp256k1")]
use secp256k1::ThirtyTwoByteHash;

macro_rules! impl_hex_fmt {
    ($T:ident) => {
        impl Debug for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    f.write_fmt(format_args!("{:02x}", b))?;
                }
                Ok(())
            }
        }

        impl Display for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                Debug::fmt(self, f)
            }
        }

        // Human readable formats (JSON for the agents' read API) get the
        // 0x-prefixed hex string, binary formats the raw bytes.
        impl Serialize for $T {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.collect_str(self)
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }
    };
}

macro_rules! bytesN {
    ( $T:ident, $N:literal ) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        pub struct $T(pub [u8; $N]);

        impl Distribution<$T> for Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $T {
                $T(rng.gen())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl From<[u8; $N]> for $T {
            fn from(bytes: [u8; $N]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $T {
            type Error = core::array::TryFromSliceError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                Ok(Self(bytes.try_into()?))
            }
        }

        impl_hex_fmt!($T);
    };
}

bytesN!(Hash, 32);

/// Caller-chosen identifier of a channel. Opaque to the contract.
pub type ChannelId = Hash;

#[cfg(feature = "secp256k1")]
impl ThirtyTwoByteHash for Hash {
    fn into_32(self) -> [u8; 32] {
        self.0
    }
}

/// Ethereum style recoverable signature: `r || s || v` with `v` in {27, 28}.
#[derive(PartialEq, Eq, Copy, Clone)]
pub struct Signature(pub [u8; 65]);
impl_hex_fmt!(Signature);

impl Signature {
    pub fn new(rs: &[u8; 64], v: u8) -> Self {
        let mut sig: Signature = Signature([0; 65]);
        sig.0[..64].copy_from_slice(rs);
        sig.0[64] = v;
        sig
    }

    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0; 65])
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = core::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

bytesN!(Address, 20);
