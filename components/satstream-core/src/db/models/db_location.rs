use satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream_postgres::tokio_postgres::Row;
use satstream_postgres::FromPgRow;
use satstream_types::{
    BitcoinBlockData, OrdinalInscriptionRevealData, OrdinalInscriptionTransferData,
    OrdinalInscriptionTransferDestination,
};

use crate::core::protocol::satoshi_tracking::{
    parse_satpoint, transfer_type_for_destination, UNBOUND_OUTPOINT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbLocation {
    pub ordinal_number: PgNumericU64,
    pub block_height: PgNumericU64,
    pub tx_index: PgBigIntU32,
    pub tx_id: String,
    pub block_hash: String,
    pub address: Option<String>,
    pub output: String,
    pub offset: Option<PgNumericU64>,
    pub prev_output: Option<String>,
    pub prev_offset: Option<PgNumericU64>,
    pub value: Option<PgNumericU64>,
    pub transfer_type: String,
    pub timestamp: PgBigIntU32,
}

impl DbLocation {
    pub fn from_reveal(
        reveal: &OrdinalInscriptionRevealData,
        block: &BitcoinBlockData,
        tx_id: &str,
    ) -> Result<Self, String> {
        let (output, offset) = parse_satpoint(&reveal.satpoint_post_inscription)?;
        let transfer_type = if reveal.inscriber_address.is_some() {
            "transferred"
        } else if output == UNBOUND_OUTPOINT {
            "spent_in_fees"
        } else {
            "burnt"
        };
        Ok(DbLocation {
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            block_height: PgNumericU64(block.block_identifier.index),
            tx_index: PgBigIntU32(reveal.tx_index as u32),
            tx_id: tx_id.to_string(),
            block_hash: block.block_identifier.hash.clone(),
            address: reveal.inscriber_address.clone(),
            output,
            offset: offset.map(PgNumericU64),
            prev_output: None,
            prev_offset: None,
            value: Some(PgNumericU64(reveal.inscription_output_value)),
            transfer_type: transfer_type.to_string(),
            timestamp: PgBigIntU32(block.timestamp),
        })
    }

    pub fn from_transfer(
        transfer: &OrdinalInscriptionTransferData,
        block: &BitcoinBlockData,
        tx_id: &str,
    ) -> Result<Self, String> {
        let (output, offset) = parse_satpoint(&transfer.satpoint_post_transfer)?;
        let (prev_output, prev_offset) = parse_satpoint(&transfer.satpoint_pre_transfer)?;
        let address = match &transfer.destination {
            OrdinalInscriptionTransferDestination::Transferred(address) => Some(address.clone()),
            _ => None,
        };
        Ok(DbLocation {
            ordinal_number: PgNumericU64(transfer.ordinal_number),
            block_height: PgNumericU64(block.block_identifier.index),
            tx_index: PgBigIntU32(transfer.tx_index as u32),
            tx_id: tx_id.to_string(),
            block_hash: block.block_identifier.hash.clone(),
            address,
            output,
            offset: offset.map(PgNumericU64),
            prev_output: Some(prev_output),
            prev_offset: prev_offset.map(PgNumericU64),
            value: transfer.post_transfer_output_value.map(PgNumericU64),
            transfer_type: transfer_type_for_destination(&transfer.destination).to_string(),
            timestamp: PgBigIntU32(block.timestamp),
        })
    }
}

impl FromPgRow for DbLocation {
    fn from_pg_row(row: &Row) -> Self {
        DbLocation {
            ordinal_number: row.get("ordinal_number"),
            block_height: row.get("block_height"),
            tx_index: row.get("tx_index"),
            tx_id: row.get("tx_id"),
            block_hash: row.get("block_hash"),
            address: row.get("address"),
            output: row.get("output"),
            offset: row.get("offset"),
            prev_output: row.get("prev_output"),
            prev_offset: row.get("prev_offset"),
            value: row.get("value"),
            transfer_type: row.get("transfer_type"),
            timestamp: row.get("timestamp"),
        }
    }
}
