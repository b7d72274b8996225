use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use crate::OrdinalOperation;

/// BlockIdentifier uniquely identifies a block in a particular network.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BlockIdentifier {
    /// Also known as the block height.
    pub index: u64,
    /// Block hash as lowercase hex, no prefix.
    pub hash: String,
}

impl BlockIdentifier {
    pub fn get_hash_bytes(&self) -> Vec<u8> {
        hex::decode(&self.hash).unwrap()
    }
}

impl Display for BlockIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Block #{} ({})", self.index, &self.hash)
    }
}

impl Hash for BlockIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.hash.hash(state);
    }
}

impl Ord for BlockIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, &self.hash).cmp(&(other.index, &other.hash))
    }
}

impl PartialOrd for BlockIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BlockIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.hash == other.hash
    }
}

impl Eq for BlockIdentifier {}

/// TransactionIdentifier uniquely identifies a transaction in a particular network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, Default)]
pub struct TransactionIdentifier {
    /// Transaction id as lowercase hex, no prefix.
    pub hash: String,
}

/// A Bitcoin block, reduced to the ordinal activity the upstream event source discovered in it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BitcoinBlockData {
    pub block_identifier: BlockIdentifier,
    pub parent_block_identifier: BlockIdentifier,
    /// Block header timestamp, seconds since the epoch.
    pub timestamp: u32,
    pub transactions: Vec<BitcoinTransactionData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BitcoinTransactionData {
    pub transaction_identifier: TransactionIdentifier,
    pub ordinal_operations: Vec<OrdinalOperation>,
}

/// A directive from the block event source. Every `Apply` must be exactly invertible by a
/// `Rollback` of the same block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockEvent {
    Apply(BitcoinBlockData),
    Rollback(BlockIdentifier),
}
