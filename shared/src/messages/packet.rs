use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    messages::{RequestId, WireError},
    sequence::SeqnoRange,
    types::{HandlerTag, Scope, Seqno},
};

/// Unit of exchange with the transport. Only `Sequenced` packets take part
/// in ordering; the other kinds drive retransmission and are sent as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    Sequenced {
        scope: Scope,
        seqno: Seqno,
        payload: Bytes,
    },
    /// Receiver to original sender: please send these again
    Retransmit {
        scope: Scope,
        ranges: Vec<SeqnoRange>,
    },
    /// Sender to receiver: seqnos below `first_available` are gone
    Truncated {
        scope: Scope,
        first_available: Seqno,
    },
}

impl Packet {
    pub fn to_bytes(&self) -> Result<Bytes, WireError> {
        encode("packet", self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        decode("packet", bytes)
    }
}

/// Result of a remote handler as sent back to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteOutcome {
    Value(Bytes),
    Failed(String),
}

/// Payload of a sequenced packet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    /// Application message
    Message(Bytes),
    Request {
        id: RequestId,
        tag: HandlerTag,
        body: Bytes,
    },
    Response {
        id: RequestId,
        outcome: RemoteOutcome,
    },
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Bytes, WireError> {
        encode("envelope", self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        decode("envelope", bytes)
    }
}

fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Bytes, WireError> {
    postcard::to_allocvec(value)
        .map(Bytes::from)
        .map_err(|error| WireError::Encode {
            what,
            reason: error.to_string(),
        })
}

fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, WireError> {
    postcard::from_bytes(bytes).map_err(|error| WireError::Decode {
        what,
        length: bytes.len(),
        reason: error.to_string(),
    })
}
