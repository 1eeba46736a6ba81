//! Message bodies and the top-level codec.

use std::net::Ipv6Addr;

use thiserror::Error;

use kestrel_blocks::{Block, BlockError, BlockType};
use kestrel_store::Vote;
use kestrel_types::{Account, BlockHash, Network};

use crate::header::{MessageHeader, MessageType};

/// Keepalives always carry exactly eight peer slots; unused slots are the
/// unspecified address with port zero.
pub const KEEPALIVE_PEERS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message shorter than its fixed layout")]
    TooShort,

    #[error("bad magic byte: {0:#04x}")]
    BadMagic(u8),

    #[error("message from a different network: {0:#04x}")]
    WrongNetwork(u8),

    #[error("unknown message type: {0}")]
    UnknownType(u8),

    #[error("header names no block type for a block-bearing message")]
    MissingBlockType,

    #[error("embedded block: {0}")]
    Block(#[from] BlockError),

    #[error("embedded vote is malformed")]
    MalformedVote,
}

/// A peer endpoint advertised in keepalives. IPv4 peers are carried as
/// mapped IPv6 addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    pub address: Ipv6Addr,
    pub port: u16,
}

impl Peer {
    pub const SERIALIZED_SIZE: usize = 18;

    pub const UNSPECIFIED: Self = Self {
        address: Ipv6Addr::UNSPECIFIED,
        port: 0,
    };

    fn to_bytes(self) -> [u8; 18] {
        let mut bytes = [0u8; 18];
        bytes[0..16].copy_from_slice(&self.address.octets());
        bytes[16..18].copy_from_slice(&self.port.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; 18]) -> Self {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&bytes[0..16]);
        Self {
            address: Ipv6Addr::from(octets),
            port: u16::from_le_bytes([bytes[16], bytes[17]]),
        }
    }
}

/// All node-to-node messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Peer advertisement, eight endpoints.
    Keepalive([Peer; KEEPALIVE_PEERS]),
    /// A freshly minted or relayed block.
    Publish(Block),
    /// Ask representatives to vote on a block.
    ConfirmReq(Block),
    /// A representative's vote.
    ConfirmAck(Vote),
    /// Walk an account chain from `start` back towards `end`.
    BulkReq {
        start: BlockHash,
        end: BlockHash,
        count: u32,
    },
    /// Stream `(account, head)` pairs starting at `start`.
    FrontierReq {
        start: Account,
        /// Skip accounts whose head is older than this many seconds.
        age: u32,
        count: u32,
    },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Keepalive(_) => MessageType::Keepalive,
            Message::Publish(_) => MessageType::Publish,
            Message::ConfirmReq(_) => MessageType::ConfirmReq,
            Message::ConfirmAck(_) => MessageType::ConfirmAck,
            Message::BulkReq { .. } => MessageType::BulkReq,
            Message::FrontierReq { .. } => MessageType::FrontierReq,
        }
    }

    /// Header + body bytes for `network`.
    pub fn serialize(&self, network: Network) -> Vec<u8> {
        let mut header = MessageHeader::new(network, self.message_type());
        match self {
            Message::Publish(block) | Message::ConfirmReq(block) => {
                header.set_block_type(block.block_type());
            }
            Message::ConfirmAck(vote) => {
                header.set_block_type(vote.block.block_type());
            }
            _ => {}
        }
        let mut bytes = header.to_bytes().to_vec();
        match self {
            Message::Keepalive(peers) => {
                for peer in peers {
                    bytes.extend_from_slice(&peer.to_bytes());
                }
            }
            Message::Publish(block) | Message::ConfirmReq(block) => {
                bytes.extend_from_slice(&block.to_bytes());
            }
            Message::ConfirmAck(vote) => {
                bytes.extend_from_slice(&vote.to_bytes());
            }
            Message::BulkReq { start, end, count } => {
                bytes.extend_from_slice(start.as_bytes());
                bytes.extend_from_slice(end.as_bytes());
                bytes.extend_from_slice(&count.to_le_bytes());
            }
            Message::FrontierReq { start, age, count } => {
                bytes.extend_from_slice(start.as_bytes());
                bytes.extend_from_slice(&age.to_le_bytes());
                bytes.extend_from_slice(&count.to_le_bytes());
            }
        }
        bytes
    }

    /// Decode one full message. Malformed input is an error value, never a
    /// panic.
    pub fn deserialize(bytes: &[u8], network: Network) -> Result<Self, MessageError> {
        let header = MessageHeader::from_bytes(bytes, network)?;
        let body = &bytes[MessageHeader::SERIALIZED_SIZE..];
        match header.message_type {
            MessageType::Keepalive => {
                if body.len() != KEEPALIVE_PEERS * Peer::SERIALIZED_SIZE {
                    return Err(MessageError::TooShort);
                }
                let mut peers = [Peer::UNSPECIFIED; KEEPALIVE_PEERS];
                for (slot, chunk) in body.chunks_exact(Peer::SERIALIZED_SIZE).enumerate() {
                    peers[slot] = Peer::from_bytes(chunk.try_into().expect("chunked exactly"));
                }
                Ok(Message::Keepalive(peers))
            }
            MessageType::Publish | MessageType::ConfirmReq => {
                let block_type = header
                    .block_type()
                    .filter(|t| t.serialized_size().is_some())
                    .ok_or(MessageError::MissingBlockType)?;
                let block = Block::deserialize(block_type, body)?;
                if header.message_type == MessageType::Publish {
                    Ok(Message::Publish(block))
                } else {
                    Ok(Message::ConfirmReq(block))
                }
            }
            MessageType::ConfirmAck => {
                let vote = Vote::from_bytes(body).map_err(|_| MessageError::MalformedVote)?;
                Ok(Message::ConfirmAck(vote))
            }
            MessageType::BulkReq => {
                if body.len() != 68 {
                    return Err(MessageError::TooShort);
                }
                Ok(Message::BulkReq {
                    start: BlockHash::from_bytes(body[0..32].try_into().unwrap()),
                    end: BlockHash::from_bytes(body[32..64].try_into().unwrap()),
                    count: u32::from_le_bytes(body[64..68].try_into().unwrap()),
                })
            }
            MessageType::FrontierReq => {
                if body.len() != 40 {
                    return Err(MessageError::TooShort);
                }
                Ok(Message::FrontierReq {
                    start: Account::from_bytes(body[0..32].try_into().unwrap()),
                    age: u32::from_le_bytes(body[32..36].try_into().unwrap()),
                    count: u32::from_le_bytes(body[36..40].try_into().unwrap()),
                })
            }
            MessageType::Invalid | MessageType::NotAType => {
                Err(MessageError::UnknownType(header.message_type.as_u8()))
            }
        }
    }
}
