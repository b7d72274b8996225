use satstream_types::{
    BitcoinBlockData, BitcoinTransactionData, BlockIdentifier, OrdinalInscriptionCurseType,
    OrdinalInscriptionNumber, OrdinalInscriptionRevealData, OrdinalInscriptionTransferData,
    OrdinalInscriptionTransferDestination, OrdinalOperation, TransactionIdentifier,
};

use crate::ord::sat::Sat;

pub fn test_block_hash(block_height: u64) -> String {
    format!("{:064x}", block_height)
}

pub fn test_tx_hash(seed: u64) -> String {
    format!("{:064x}", 0xf000_0000_0000_0000u64 | seed)
}

pub fn make_block(
    block_height: u64,
    transactions: Vec<BitcoinTransactionData>,
) -> BitcoinBlockData {
    BitcoinBlockData {
        block_identifier: BlockIdentifier {
            index: block_height,
            hash: test_block_hash(block_height),
        },
        parent_block_identifier: BlockIdentifier {
            index: block_height - 1,
            hash: test_block_hash(block_height - 1),
        },
        timestamp: 1677803510 + block_height as u32,
        transactions,
    }
}

pub fn make_tx(tx_hash: &str, ordinal_operations: Vec<OrdinalOperation>) -> BitcoinTransactionData {
    BitcoinTransactionData {
        transaction_identifier: TransactionIdentifier {
            hash: tx_hash.to_string(),
        },
        ordinal_operations,
    }
}

pub fn make_reveal(
    inscription_id: &str,
    number: i64,
    ordinal_number: u64,
    address: &str,
    tx_index: usize,
) -> OrdinalInscriptionRevealData {
    let txid = inscription_id.split('i').next().unwrap();
    OrdinalInscriptionRevealData {
        content_bytes: hex::encode("satstream test content"),
        content_type: "text/plain;charset=utf-8".to_string(),
        content_length: 22,
        inscription_number: OrdinalInscriptionNumber {
            classic: number,
            jubilee: number,
        },
        inscription_fee: 100,
        inscription_output_value: 10000,
        inscription_id: inscription_id.to_string(),
        inscription_input_index: 0,
        inscription_pointer: None,
        inscriber_address: Some(address.to_string()),
        delegate: None,
        metaprotocol: None,
        metadata: None,
        parents: vec![],
        ordinal_number,
        ordinal_block_height: Sat(ordinal_number).height(),
        ordinal_offset: 0,
        tx_index,
        satpoint_post_inscription: format!("{txid}:0:0"),
        curse_type: if number < 0 {
            Some(OrdinalInscriptionCurseType::Generic)
        } else {
            None
        },
        charms: 0,
    }
}

pub fn make_brc20_reveal(
    inscription_id: &str,
    number: i64,
    ordinal_number: u64,
    address: &str,
    tx_index: usize,
    payload: serde_json::Value,
) -> OrdinalInscriptionRevealData {
    let mut reveal = make_reveal(inscription_id, number, ordinal_number, address, tx_index);
    let body = payload.to_string();
    reveal.content_length = body.len();
    reveal.content_bytes = hex::encode(body);
    reveal
}

pub fn make_transfer(
    ordinal_number: u64,
    to_address: &str,
    satpoint_pre_transfer: &str,
    tx_hash: &str,
    tx_index: usize,
) -> OrdinalInscriptionTransferData {
    OrdinalInscriptionTransferData {
        ordinal_number,
        destination: OrdinalInscriptionTransferDestination::Transferred(to_address.to_string()),
        satpoint_pre_transfer: satpoint_pre_transfer.to_string(),
        satpoint_post_transfer: format!("{tx_hash}:0:0"),
        post_transfer_output_value: Some(9000),
        tx_index,
    }
}
