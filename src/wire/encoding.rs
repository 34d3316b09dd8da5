use alloc::vec::Vec;
use prost::{bytes::BufMut, Message};

use super::{proto::SignedProposalMsg, ProposalBus};
use crate::{
    channel::{BalanceProposal, SignedProposal},
    types::{ChannelId, Signature},
};

/// Length of the frame header.
const PREFIX_LEN: usize = 2;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("message of {0} bytes does not fit a u16 length prefix")]
    Oversize(usize),
    #[error("frame is {0} bytes, too short for the length prefix")]
    Truncated(usize),
    #[error("length prefix says {expected} bytes, frame carries {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("protobuf decoding failed")]
    Decode,
    #[error("field {field} must be {expected} bytes, got {actual}")]
    ByteLengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl From<SignedProposal> for SignedProposalMsg {
    fn from(signed: SignedProposal) -> Self {
        Self {
            channel_id: signed.proposal.channel_id.0.to_vec(),
            nonce: signed.proposal.nonce,
            balance_a: signed.proposal.balance_a,
            signature: signed.sig.0.to_vec(),
        }
    }
}

impl TryFrom<SignedProposalMsg> for SignedProposal {
    type Error = WireError;

    fn try_from(msg: SignedProposalMsg) -> Result<Self, Self::Error> {
        let channel_id = ChannelId::try_from(msg.channel_id.as_slice()).map_err(|_| {
            WireError::ByteLengthMismatch {
                field: "channel_id",
                expected: 32,
                actual: msg.channel_id.len(),
            }
        })?;
        let sig = Signature::try_from(msg.signature.as_slice()).map_err(|_| {
            WireError::ByteLengthMismatch {
                field: "signature",
                expected: 65,
                actual: msg.signature.len(),
            }
        })?;
        Ok(SignedProposal {
            proposal: BalanceProposal::new(channel_id, msg.nonce, msg.balance_a),
            sig,
        })
    }
}

/// Frame a signed proposal for the relay.
pub fn encode(signed: SignedProposal) -> Result<Vec<u8>, WireError> {
    // A u16 length prefix, not the LEB128 varint `encode_length_delimited`
    // would write.
    let msg = SignedProposalMsg::from(signed);
    let len = msg.encoded_len();
    let prefix = u16::try_from(len).map_err(|_| WireError::Oversize(len))?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + len);
    buf.put_slice(&prefix.to_be_bytes());
    msg.encode(&mut buf).map_err(|_| WireError::Oversize(len))?;
    Ok(buf)
}

/// Parse one complete frame.
pub fn decode(frame: &[u8]) -> Result<SignedProposal, WireError> {
    if frame.len() < PREFIX_LEN {
        return Err(WireError::Truncated(frame.len()));
    }
    let (prefix, body) = frame.split_at(PREFIX_LEN);
    let expected = usize::from(u16::from_be_bytes([prefix[0], prefix[1]]));
    if body.len() != expected {
        return Err(WireError::LengthMismatch {
            expected,
            actual: body.len(),
        });
    }

    let msg = SignedProposalMsg::decode(body).map_err(|_| WireError::Decode)?;
    SignedProposal::try_from(msg)
}

#[derive(Debug)]
pub struct ProtoBufEncodingLayer<B: ProposalBus> {
    pub bus: B,
}

impl<B: ProposalBus> ProtoBufEncodingLayer<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Encode `signed` and hand it to the counterparty.
    pub fn relay(&self, signed: SignedProposal) -> Result<(), WireError> {
        let buf = encode(signed)?;
        tracing::debug!(
            channel = %signed.proposal.channel_id,
            nonce = signed.proposal.nonce,
            len = buf.len(),
            "relaying proposal"
        );
        self.bus.send_to_counterparty(&buf);
        Ok(())
    }
}
