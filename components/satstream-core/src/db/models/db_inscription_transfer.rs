use satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream_postgres::tokio_postgres::Row;
use satstream_postgres::FromPgRow;

/// One row per post-genesis move of an inscription, ordered by
/// `(block_height, block_transfer_index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInscriptionTransfer {
    pub inscription_id: String,
    pub number: i64,
    pub ordinal_number: PgNumericU64,
    pub block_height: PgNumericU64,
    pub tx_index: PgBigIntU32,
    pub block_hash: String,
    pub from_block_height: PgNumericU64,
    pub from_tx_index: PgBigIntU32,
    pub block_transfer_index: i32,
}

impl FromPgRow for DbInscriptionTransfer {
    fn from_pg_row(row: &Row) -> Self {
        DbInscriptionTransfer {
            inscription_id: row.get("inscription_id"),
            number: row.get("number"),
            ordinal_number: row.get("ordinal_number"),
            block_height: row.get("block_height"),
            tx_index: row.get("tx_index"),
            block_hash: row.get("block_hash"),
            from_block_height: row.get("from_block_height"),
            from_tx_index: row.get("from_tx_index"),
            block_transfer_index: row.get("block_transfer_index"),
        }
    }
}
