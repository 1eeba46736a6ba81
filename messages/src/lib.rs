//! Wire messages for node-to-node communication.
//!
//! Every message starts with the fixed 8-byte header
//! `magic ‖ network ‖ version_max ‖ version_using ‖ version_min ‖ type ‖
//! extensions(u16 LE)`. For messages embedding a block, the low byte of the
//! extensions field carries the block's type tag so the receiver knows how
//! many payload bytes to expect.

pub mod header;
pub mod message;

pub use header::{MessageHeader, MessageType, PROTOCOL_VERSION_MAX, PROTOCOL_VERSION_MIN, PROTOCOL_VERSION_USING};
pub use message::{Message, MessageError, Peer, KEEPALIVE_PEERS};
