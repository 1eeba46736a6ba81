//! Bootstrap transport: the TCP server streaming frontiers and chains, and
//! the client that drives catch-up.
//!
//! Streams follow the wire contract: a frontier response is a sequence of
//! `account(32) ‖ head(32)` pairs ending with a zero account; a bulk
//! response is a sequence of `type_tag ‖ block` records ending with the
//! `not_a_block` tag. Every read is bounded by a per-message timeout —
//! exceeding it tears the connection down and the caller retries the
//! outstanding pulls elsewhere.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use kestrel_blocks::{Block, BlockType};
use kestrel_ledger::Ledger;
use kestrel_messages::{Message, MessageHeader, MessageType};
use kestrel_types::{Account, BlockHash, Network, Timestamp};
use kestrel_utils::seconds_since_epoch;

use crate::block_processor::BlockProcessor;
use crate::bootstrap::{compare_frontiers, serve_bulk, serve_frontiers, PullRequest};
use crate::error::NodeError;

/// Cap on queued pulls per connection; producers wait rather than buffer.
pub const MAX_OUTSTANDING_PULLS: usize = 10;

const FRONTIER_PAIR_SIZE: usize = 64;

// ── Timed IO helpers ───────────────────────────────────────────────────

async fn read_exact_timed(
    stream: &mut TcpStream,
    buf: &mut [u8],
    limit: Duration,
) -> Result<(), NodeError> {
    timeout(limit, stream.read_exact(buf))
        .await
        .map_err(|_| NodeError::Bootstrap("read timed out".to_string()))??;
    Ok(())
}

async fn write_all_timed(
    stream: &mut TcpStream,
    bytes: &[u8],
    limit: Duration,
) -> Result<(), NodeError> {
    timeout(limit, stream.write_all(bytes))
        .await
        .map_err(|_| NodeError::Bootstrap("write timed out".to_string()))??;
    Ok(())
}

/// Body size implied by a header, for the fixed-layout request messages the
/// bootstrap server accepts.
fn request_body_size(header: &MessageHeader) -> Result<usize, NodeError> {
    match header.message_type {
        MessageType::BulkReq => Ok(68),
        MessageType::FrontierReq => Ok(40),
        other => Err(NodeError::Bootstrap(format!(
            "unexpected message type {} on a bootstrap connection",
            other.as_u8()
        ))),
    }
}

// ── Server ─────────────────────────────────────────────────────────────

pub struct BootstrapServer {
    ledger: Arc<Ledger>,
    network: Network,
    io_timeout: Duration,
}

impl BootstrapServer {
    pub fn new(ledger: Arc<Ledger>, network: Network) -> Self {
        Self {
            ledger,
            network,
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Accept loop; one task per connection.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "bootstrap connection accepted");
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(error) = server.handle(stream).await {
                            debug!(%peer, %error, "bootstrap connection closed");
                        }
                    });
                }
                Err(error) => {
                    warn!(%error, "bootstrap accept failed");
                }
            }
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<(), NodeError> {
        loop {
            let mut header_bytes = [0u8; MessageHeader::SERIALIZED_SIZE];
            if stream.read_exact(&mut header_bytes).await.is_err() {
                // Peer went away between requests.
                return Ok(());
            }
            let header = MessageHeader::from_bytes(&header_bytes, self.network)
                .map_err(|e| NodeError::Bootstrap(e.to_string()))?;
            let mut body = vec![0u8; request_body_size(&header)?];
            read_exact_timed(&mut stream, &mut body, self.io_timeout).await?;

            let mut message_bytes = header_bytes.to_vec();
            message_bytes.extend_from_slice(&body);
            let message = Message::deserialize(&message_bytes, self.network)
                .map_err(|e| NodeError::Bootstrap(e.to_string()))?;
            match message {
                Message::FrontierReq { start, age, count } => {
                    self.send_frontiers(&mut stream, start, age, count).await?;
                }
                Message::BulkReq { start, end, count } => {
                    self.send_bulk(&mut stream, start, end, count).await?;
                }
                _ => unreachable!("request_body_size admits only bootstrap requests"),
            }
        }
    }

    async fn send_frontiers(
        &self,
        stream: &mut TcpStream,
        start: Account,
        age: u32,
        count: u32,
    ) -> Result<(), NodeError> {
        let frontiers = {
            let txn = self.ledger.store.tx_begin_read()?;
            serve_frontiers(
                &self.ledger,
                &txn,
                start,
                age,
                count,
                Timestamp::new(seconds_since_epoch()),
            )?
        };
        for (account, head) in &frontiers {
            let mut pair = [0u8; FRONTIER_PAIR_SIZE];
            pair[0..32].copy_from_slice(account.as_bytes());
            pair[32..64].copy_from_slice(head.as_bytes());
            write_all_timed(stream, &pair, self.io_timeout).await?;
        }
        // A zero account ends the stream.
        write_all_timed(stream, &[0u8; FRONTIER_PAIR_SIZE], self.io_timeout).await?;
        debug!(served = frontiers.len(), "frontier request answered");
        Ok(())
    }

    async fn send_bulk(
        &self,
        stream: &mut TcpStream,
        start: BlockHash,
        end: BlockHash,
        count: u32,
    ) -> Result<(), NodeError> {
        let served = {
            let txn = self.ledger.store.tx_begin_read()?;
            serve_bulk(&self.ledger, &txn, start, end, count)?
        };
        match served {
            Ok(blocks) => {
                for block in &blocks {
                    write_all_timed(stream, &block.serialize_with_type(), self.io_timeout).await?;
                }
                write_all_timed(stream, &[BlockType::NotABlock.as_u8()], self.io_timeout).await?;
                debug!(served = blocks.len(), "bulk request answered");
                Ok(())
            }
            Err(reason) => {
                // Refused: terminate the stream immediately.
                write_all_timed(stream, &[BlockType::NotABlock.as_u8()], self.io_timeout).await?;
                debug!(?reason, "bulk request refused");
                Ok(())
            }
        }
    }
}

// ── Client ─────────────────────────────────────────────────────────────

pub struct BootstrapClient {
    processor: Arc<BlockProcessor>,
    network: Network,
    io_timeout: Duration,
}

impl BootstrapClient {
    pub fn new(processor: Arc<BlockProcessor>, network: Network) -> Self {
        Self {
            processor,
            network,
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Catch up from one peer: fetch its frontiers, diff, pull every
    /// divergent chain and feed the blocks through the processor. Returns
    /// the number of blocks accepted.
    ///
    /// On failure the untaken pulls are returned in the error path by the
    /// caller retrying against a different peer — this connection's queue
    /// dies with it.
    pub async fn bootstrap(&self, peer: std::net::SocketAddr) -> Result<u64, NodeError> {
        let mut stream = TcpStream::connect(peer).await?;
        let frontiers = self.fetch_frontiers(&mut stream).await?;
        info!(peer = %peer, frontiers = frontiers.len(), "frontier exchange complete");

        let pulls = {
            let ledger = self.processor.ledger();
            let txn = ledger.store.tx_begin_read()?;
            compare_frontiers(ledger, &txn, &frontiers)?
        };

        // Bounded queue between the diff (producer) and the connection
        // (consumer): enqueueing blocks once the consumer falls behind.
        let (tx, mut rx) = mpsc::channel::<PullRequest>(MAX_OUTSTANDING_PULLS);
        let producer = tokio::spawn(async move {
            for pull in pulls {
                if tx.send(pull).await.is_err() {
                    // Channel closed: the connection died; the remaining
                    // pulls are retried elsewhere by the caller.
                    break;
                }
            }
        });

        let mut accepted = 0u64;
        while let Some(pull) = rx.recv().await {
            let blocks = self.pull_chain(&mut stream, &pull).await?;
            accepted += self.ingest(blocks)?;
        }
        producer
            .await
            .map_err(|e| NodeError::Bootstrap(e.to_string()))?;
        Ok(accepted)
    }

    async fn fetch_frontiers(
        &self,
        stream: &mut TcpStream,
    ) -> Result<Vec<(Account, BlockHash)>, NodeError> {
        let request = Message::FrontierReq {
            start: Account::ZERO,
            age: u32::MAX,
            count: u32::MAX,
        };
        write_all_timed(stream, &request.serialize(self.network), self.io_timeout).await?;

        let mut frontiers = Vec::new();
        loop {
            let mut pair = [0u8; FRONTIER_PAIR_SIZE];
            read_exact_timed(stream, &mut pair, self.io_timeout).await?;
            let account = Account::from_bytes(pair[0..32].try_into().unwrap());
            if account.is_zero() {
                return Ok(frontiers);
            }
            let head = BlockHash::from_bytes(pair[32..64].try_into().unwrap());
            frontiers.push((account, head));
        }
    }

    async fn pull_chain(
        &self,
        stream: &mut TcpStream,
        pull: &PullRequest,
    ) -> Result<Vec<Block>, NodeError> {
        let request = Message::BulkReq {
            start: pull.start,
            end: pull.end,
            count: u32::MAX,
        };
        write_all_timed(stream, &request.serialize(self.network), self.io_timeout).await?;

        let mut blocks = Vec::new();
        loop {
            let mut tag = [0u8; 1];
            read_exact_timed(stream, &mut tag, self.io_timeout).await?;
            let block_type = BlockType::from_u8(tag[0])
                .ok_or_else(|| NodeError::Bootstrap(format!("unknown block tag {}", tag[0])))?;
            if block_type == BlockType::NotABlock {
                debug!(account = %pull.account, blocks = blocks.len(), "pull complete");
                return Ok(blocks);
            }
            let size = block_type
                .serialized_size()
                .ok_or_else(|| NodeError::Bootstrap("invalid block tag in stream".to_string()))?;
            let mut payload = vec![0u8; size];
            read_exact_timed(stream, &mut payload, self.io_timeout).await?;
            let block = Block::deserialize(block_type, &payload)
                .map_err(|e| NodeError::Bootstrap(e.to_string()))?;
            blocks.push(block);
        }
    }

    /// Feed pulled blocks through the regular processing path, oldest
    /// first so chains apply without gaps.
    fn ingest(&self, mut blocks: Vec<Block>) -> Result<u64, NodeError> {
        blocks.reverse();
        let ledger = self.processor.ledger();
        let now = Timestamp::new(seconds_since_epoch());
        let mut txn = ledger.store.tx_begin_write()?;
        let mut accepted = 0;
        for block in blocks {
            if let Some(result) = self.processor.process(&mut txn, block, now)? {
                if result.code == kestrel_ledger::ProcessResult::Progress {
                    accepted += 1;
                }
            }
        }
        ledger.store.flush(&mut txn)?;
        txn.commit().map_err(kestrel_store_lmdb::map_heed)?;
        Ok(accepted)
    }
}
