use satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream_postgres::tokio_postgres::Row;
use satstream_postgres::FromPgRow;
use satstream_types::{BitcoinBlockData, OrdinalInscriptionRevealData};

use crate::ord::media::mime_type;
use crate::ord::sat::Sat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInscription {
    pub inscription_id: String,
    pub ordinal_number: PgNumericU64,
    pub number: i64,
    pub classic_number: i64,
    pub block_height: PgNumericU64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: PgBigIntU32,
    pub address: Option<String>,
    pub mime_type: String,
    pub content_type: String,
    pub content_length: PgBigIntU32,
    pub content: Vec<u8>,
    pub fee: PgNumericU64,
    pub curse_type: Option<String>,
    pub recursive: bool,
    pub input_index: PgBigIntU32,
    pub pointer: Option<PgNumericU64>,
    pub metadata: Option<String>,
    pub metaprotocol: Option<String>,
    pub delegate: Option<String>,
    pub timestamp: PgBigIntU32,
    pub charms: i32,
}

impl DbInscription {
    pub fn from_reveal(
        reveal: &OrdinalInscriptionRevealData,
        block: &BitcoinBlockData,
        tx_id: &str,
    ) -> Result<Self, String> {
        let content = hex::decode(&reveal.content_bytes)
            .map_err(|e| format!("unable to decode inscription content: {e}"))?;
        let charms = reveal.charms | Sat::from_ordinal(reveal.ordinal_number)?.charms();
        Ok(DbInscription {
            inscription_id: reveal.inscription_id.clone(),
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            number: reveal.inscription_number.jubilee,
            classic_number: reveal.inscription_number.classic,
            block_height: PgNumericU64(block.block_identifier.index),
            block_hash: block.block_identifier.hash.clone(),
            tx_id: tx_id.to_string(),
            tx_index: PgBigIntU32(reveal.tx_index as u32),
            address: reveal.inscriber_address.clone(),
            mime_type: mime_type(&reveal.content_type),
            content_type: reveal.content_type.clone(),
            content_length: PgBigIntU32(reveal.content_length as u32),
            content,
            fee: PgNumericU64(reveal.inscription_fee),
            curse_type: reveal.curse_type.as_ref().map(|c| c.as_str().to_string()),
            recursive: false,
            input_index: PgBigIntU32(reveal.inscription_input_index as u32),
            pointer: reveal.inscription_pointer.map(PgNumericU64),
            metadata: reveal.metadata.as_ref().map(|m| m.to_string()),
            metaprotocol: reveal.metaprotocol.clone(),
            delegate: reveal.delegate.clone(),
            timestamp: PgBigIntU32(block.timestamp),
            charms: charms as i32,
        })
    }

    pub fn is_blessed(&self) -> bool {
        self.classic_number >= 0
    }
}

impl FromPgRow for DbInscription {
    fn from_pg_row(row: &Row) -> Self {
        DbInscription {
            inscription_id: row.get("inscription_id"),
            ordinal_number: row.get("ordinal_number"),
            number: row.get("number"),
            classic_number: row.get("classic_number"),
            block_height: row.get("block_height"),
            block_hash: row.get("block_hash"),
            tx_id: row.get("tx_id"),
            tx_index: row.get("tx_index"),
            address: row.get("address"),
            mime_type: row.get("mime_type"),
            content_type: row.get("content_type"),
            content_length: row.get("content_length"),
            content: row.get("content"),
            fee: row.get("fee"),
            curse_type: row.get("curse_type"),
            recursive: row.get("recursive"),
            input_index: row.get("input_index"),
            pointer: row.get("pointer"),
            metadata: row.get("metadata"),
            metaprotocol: row.get("metaprotocol"),
            delegate: row.get("delegate"),
            timestamp: row.get("timestamp"),
            charms: row.get("charms"),
        }
    }
}
