//! Node assembly: store, ledger, processors and the background loops.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use kestrel_blocks::Block;
use kestrel_consensus::{ActiveElections, ElectionConfig};
use kestrel_crypto::blake2b_256;
use kestrel_ledger::{Ledger, LedgerConstants};
use kestrel_messages::Message;
use kestrel_store::UncheckedInfo;
use kestrel_store_lmdb::LmdbStore;
use kestrel_types::{BlockHash, Timestamp};
use kestrel_utils::seconds_since_epoch;

use crate::block_processor::BlockProcessor;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::sync::{BootstrapClient, BootstrapServer};
use crate::vote_processor::VoteProcessor;

/// Depth of the writer's work queue; submitters wait when it is full.
const WRITER_QUEUE_DEPTH: usize = 1024;
/// Blocks drained into one write transaction per batch.
const WRITER_BATCH: usize = 256;

/// A fully wired node.
pub struct KestrelNode {
    pub config: NodeConfig,
    pub ledger: Arc<Ledger>,
    pub processor: Arc<BlockProcessor>,
    pub elections: Arc<ActiveElections>,
    pub votes: Arc<VoteProcessor>,
    work_tx: mpsc::Sender<Block>,
    work_rx: Mutex<Option<mpsc::Receiver<Block>>>,
}

impl KestrelNode {
    /// Open the store, seed genesis and wire the components.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let store = Arc::new(LmdbStore::open(&config.node.data_dir)?);
        let constants = LedgerConstants::for_network(config.node.network);
        let ledger = Arc::new(Ledger::new(store, constants));
        {
            let mut txn = ledger.store.tx_begin_write()?;
            ledger.initialize(&mut txn)?;
            txn.commit().map_err(kestrel_store_lmdb::map_heed)?;
        }
        let elections = Arc::new(ActiveElections::new(ElectionConfig::default()));
        let processor = Arc::new(BlockProcessor::new(ledger.clone(), elections.clone()));
        let votes = Arc::new(VoteProcessor::new(
            ledger.clone(),
            elections.clone(),
            config.vote_minimum()?,
        ));
        info!(
            network = config.node.network.as_str(),
            data_dir = %config.node.data_dir.display(),
            "node assembled"
        );
        let (work_tx, work_rx) = mpsc::channel(WRITER_QUEUE_DEPTH);
        Ok(Self {
            config,
            ledger,
            processor,
            elections,
            votes,
            work_tx,
            work_rx: Mutex::new(Some(work_rx)),
        })
    }

    /// Hand a block to the writer. Awaits while the queue is full, so a
    /// slow writer backpressures its producers instead of buffering
    /// without bound.
    pub async fn submit(&self, block: Block) -> Result<(), NodeError> {
        self.work_tx
            .send(block)
            .await
            .map_err(|_| NodeError::Bootstrap("writer queue closed".to_string()))
    }

    /// The writer loop: drain the queue in batches, each batch under one
    /// write transaction. Submissions complete strictly in order.
    async fn run_writer(processor: Arc<BlockProcessor>, mut rx: mpsc::Receiver<Block>) {
        while let Some(first) = rx.recv().await {
            let mut batch = vec![first];
            while batch.len() < WRITER_BATCH {
                match rx.try_recv() {
                    Ok(block) => batch.push(block),
                    Err(_) => break,
                }
            }
            let now = Timestamp::new(seconds_since_epoch());
            let ledger = processor.ledger().clone();
            let result = (|| -> Result<(), NodeError> {
                let mut txn = ledger.store.tx_begin_write()?;
                for block in batch {
                    processor.process(&mut txn, block, now)?;
                }
                ledger.store.flush(&mut txn)?;
                txn.commit().map_err(kestrel_store_lmdb::map_heed)?;
                Ok(())
            })();
            if let Err(error) = result {
                warn!(%error, "writer batch failed");
            }
        }
    }

    /// Serve bootstrap requests and run the periodic sweeps until the task
    /// is cancelled.
    pub async fn run(&self) -> Result<(), NodeError> {
        let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.node.peering_port));
        let listener = TcpListener::bind(address).await?;
        info!(%address, "bootstrap server listening");
        let server = Arc::new(BootstrapServer::new(
            self.ledger.clone(),
            self.config.node.network,
        ));
        let server_task = tokio::spawn(server.run(listener));

        let work_rx = self
            .work_rx
            .lock()
            .expect("writer receiver poisoned")
            .take()
            .expect("run called twice");
        let writer_task = tokio::spawn(Self::run_writer(self.processor.clone(), work_rx));

        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            sweep.tick().await;
            match self.housekeep() {
                Ok(requests) => {
                    // Outbound delivery belongs to the gossip layer; here
                    // they are only accounted for.
                    if !requests.is_empty() {
                        info!(requests = requests.len(), "confirm requests prepared");
                    }
                }
                Err(error) => {
                    warn!(%error, "housekeeping failed");
                    if matches!(error, NodeError::Store(kestrel_store::StoreError::Corrupted(_))) {
                        server_task.abort();
                        writer_task.abort();
                        return Err(error);
                    }
                }
            }
        }
    }

    /// One maintenance pass: sweep stale unchecked entries, retire
    /// finished elections (expired candidates re-enter the unchecked
    /// buffer), and assemble the next round of confirm requests — the
    /// quiet elections plus one random ledger sample to solicit votes
    /// without scanning.
    pub fn housekeep(&self) -> Result<Vec<Message>, NodeError> {
        const REQUEST_INTERVAL_SECS: u64 = 30;

        let now = Timestamp::new(seconds_since_epoch());
        let mut txn = self.ledger.store.tx_begin_write()?;
        let swept = self
            .processor
            .sweep_unchecked(&mut txn, self.config.node.unchecked_cutoff_secs, now)?;
        let expired = self.elections.prune(now);
        for block in &expired {
            let root = BlockHash::from_bytes(*block.root().as_bytes());
            self.ledger.store.unchecked.put(
                &mut txn,
                &root,
                &UncheckedInfo::new(block.clone(), now.as_secs()),
            )?;
        }

        let mut requests: Vec<Message> = self
            .elections
            .confirm_requests(REQUEST_INTERVAL_SECS, now)
            .into_iter()
            .map(|(_, block, _)| Message::ConfirmReq(block))
            .collect();
        if !requests.is_empty() {
            let seed = BlockHash::from_bytes(blake2b_256(&now.as_secs().to_le_bytes()));
            if let Some((sample, _)) = self.ledger.store.blocks.random(&txn, &seed)? {
                requests.push(Message::ConfirmReq(sample));
            }
        }

        self.ledger.store.flush(&mut txn)?;
        txn.commit().map_err(kestrel_store_lmdb::map_heed)?;
        if swept > 0 || !expired.is_empty() {
            info!(swept, requeued = expired.len(), "housekeeping pass");
        }
        Ok(requests)
    }

    /// Catch up from the given peers, moving on when one fails.
    pub async fn bootstrap_from(&self, peers: &[SocketAddr]) -> Result<u64, NodeError> {
        let client = BootstrapClient::new(self.processor.clone(), self.config.node.network);
        let mut total = 0;
        let mut last_error = None;
        for peer in peers {
            match client.bootstrap(*peer).await {
                Ok(accepted) => {
                    total += accepted;
                    return Ok(total);
                }
                Err(error) => {
                    warn!(%peer, %error, "bootstrap attempt failed; trying next peer");
                    last_error = Some(error);
                }
            }
        }
        match last_error {
            Some(error) => Err(error),
            None => Ok(total),
        }
    }
}
