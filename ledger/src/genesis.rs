//! Genesis blocks — the first block on each network.
//!
//! Every network starts from a single legacy open block whose source field
//! repeats the genesis account and which assigns the entire supply to that
//! account. The dev genesis key pair is published so tests and local
//! networks can spend from genesis; the live and beta keys are not.

use kestrel_blocks::{Block, OpenBlock};
use kestrel_crypto::{sign_message, KeyPair};
use kestrel_types::{Account, Amount, BlockHash, Network, Signature};
use kestrel_work::{WorkGenerator, WorkThresholds};

/// Seed of the published dev-network genesis key.
const DEV_GENESIS_SEED: [u8; 32] = *b"kestrel dev genesis seed 0000001";

/// The well-known live genesis account and its launch signature.
const LIVE_GENESIS_ACCOUNT: &str =
    "8F6C21C1A4F0387F2CDFF4D7FD47E2F2F073DCCAF7B09CBE95C31A833E47455B";
const LIVE_GENESIS_SIGNATURE: &str =
    "5B7A28A96C9C0B1E38E1B5A6A7C76A9F3E67C5A34702E18D8A3C8A3BFD2F4F6D\
     01C2B9F1E0D6A9C4B7E2F5A8D1C4B7EAFD90C3B6E9F2A5D8C1B4E7FA0D3C6B9E";
const LIVE_GENESIS_WORK: u64 = 0x62F0_5417_DD3F_B691;

/// The well-known beta genesis account and its launch signature.
const BETA_GENESIS_ACCOUNT: &str =
    "A59A47CC4F593E75AE9AD653FDA9358E2F7898D9ACC8C60E80D0495CE20FC9AC";
const BETA_GENESIS_SIGNATURE: &str =
    "A726490E3325E4FA59C1C900D5B6EEBB15FE13D99F49D475B93F0AACC5635929\
     A0614CF3892764A04D1C6732A0D716FFEB254D4154C6F544D11E6630F201450B";
const BETA_GENESIS_WORK: u64 = 0x0000_0000_EF35_3634;

/// The key pair behind the dev genesis account.
pub fn dev_genesis_key() -> KeyPair {
    KeyPair::from_seed(DEV_GENESIS_SEED)
}

/// A network's first block and the account it opens.
#[derive(Clone, Debug)]
pub struct Genesis {
    pub account: Account,
    pub block: Block,
}

impl Genesis {
    /// The entire monetary base, held by genesis until spent.
    pub const AMOUNT: Amount = Amount::MAX;

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Live => Self::from_record(
                LIVE_GENESIS_ACCOUNT,
                LIVE_GENESIS_SIGNATURE,
                LIVE_GENESIS_WORK,
            ),
            Network::Beta => Self::from_record(
                BETA_GENESIS_ACCOUNT,
                BETA_GENESIS_SIGNATURE,
                BETA_GENESIS_WORK,
            ),
            Network::Dev => Self::dev(),
        }
    }

    /// Dev genesis, signed at startup with the published key. The work
    /// nonce is solved on the spot against the dev threshold; work is not
    /// part of the hash, so the genesis hash stays deterministic.
    pub fn dev() -> Self {
        let keys = dev_genesis_key();
        let account = keys.account();
        let mut block = OpenBlock {
            source: BlockHash::from(account),
            representative: account,
            account,
            signature: Signature::ZERO,
            work: 0,
        };
        block.signature = sign_message(&keys, block.hash().as_bytes());
        block.work = WorkGenerator
            .generate(&Block::Open(block.clone()).root(), WorkThresholds::dev().epoch_1)
            .expect("dev threshold is trivially satisfiable");
        Self {
            account,
            block: Block::Open(block),
        }
    }

    fn from_record(account_hex: &str, signature_hex: &str, work: u64) -> Self {
        let account = Account::decode_hex(account_hex).expect("genesis account constant");
        let signature_bytes: [u8; 64] = hex::decode(signature_hex)
            .expect("genesis signature constant")
            .try_into()
            .expect("genesis signature length");
        let block = OpenBlock {
            source: BlockHash::from(account),
            representative: account,
            account,
            signature: Signature::from_bytes(signature_bytes),
            work,
        };
        Self {
            account,
            block: Block::Open(block),
        }
    }

    pub fn hash(&self) -> BlockHash {
        self.block.hash()
    }
}
