//! Relaying signed balance proposals between the two parties.
//!
//! Frames are a protobuf [proto::SignedProposalMsg] preceded by its length as
//! a big-endian u16. The transport may drop, duplicate or reorder frames;
//! the contract's nonce rule makes that harmless.

mod encoding;

use core::fmt::Debug;

pub use encoding::{decode, encode, ProtoBufEncodingLayer, WireError};

/// Wire representation of a signed proposal.
pub mod proto {
    use alloc::vec::Vec;

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SignedProposalMsg {
        #[prost(bytes = "vec", tag = "1")]
        pub channel_id: Vec<u8>,
        #[prost(uint32, tag = "2")]
        pub nonce: u32,
        #[prost(uint32, tag = "3")]
        pub balance_a: u32,
        #[prost(bytes = "vec", tag = "4")]
        pub signature: Vec<u8>,
    }
}

/// Raw byte transport to the counterparty.
pub trait ProposalBus: Debug {
    fn send_to_counterparty(&self, msg: &[u8]);
}
