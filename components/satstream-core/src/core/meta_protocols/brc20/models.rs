use satstream_postgres::tokio_postgres::Row;
use satstream_postgres::types::{PgBigIntU32, PgNumericU128, PgNumericU64, PgSmallIntU8};
use satstream_postgres::FromPgRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbToken {
    pub ticker: String,
    pub display_ticker: String,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub block_height: PgNumericU64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: PgBigIntU32,
    pub address: String,
    pub max: PgNumericU128,
    pub limit: PgNumericU128,
    pub decimals: PgSmallIntU8,
    pub self_mint: bool,
    pub minted_supply: PgNumericU128,
    pub tx_count: i64,
    pub timestamp: PgBigIntU32,
}

impl FromPgRow for DbToken {
    fn from_pg_row(row: &Row) -> Self {
        DbToken {
            ticker: row.get("ticker"),
            display_ticker: row.get("display_ticker"),
            inscription_id: row.get("inscription_id"),
            inscription_number: row.get("inscription_number"),
            block_height: row.get("block_height"),
            block_hash: row.get("block_hash"),
            tx_id: row.get("tx_id"),
            tx_index: row.get("tx_index"),
            address: row.get("address"),
            max: row.get("max"),
            limit: row.get("limit"),
            decimals: row.get("decimals"),
            self_mint: row.get("self_mint"),
            minted_supply: row.get("minted_supply"),
            tx_count: row.get("tx_count"),
            timestamp: row.get("timestamp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbOperation {
    pub ticker: String,
    pub operation: String,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub ordinal_number: PgNumericU64,
    pub block_height: PgNumericU64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: PgBigIntU32,
    pub output: String,
    pub offset: Option<PgNumericU64>,
    pub timestamp: PgBigIntU32,
    pub address: String,
    pub to_address: Option<String>,
    pub amount: PgNumericU128,
}

impl FromPgRow for DbOperation {
    fn from_pg_row(row: &Row) -> Self {
        DbOperation {
            ticker: row.get("ticker"),
            operation: row.get("operation"),
            inscription_id: row.get("inscription_id"),
            inscription_number: row.get("inscription_number"),
            ordinal_number: row.get("ordinal_number"),
            block_height: row.get("block_height"),
            block_hash: row.get("block_hash"),
            tx_id: row.get("tx_id"),
            tx_index: row.get("tx_index"),
            output: row.get("output"),
            offset: row.get("offset"),
            timestamp: row.get("timestamp"),
            address: row.get("address"),
            to_address: row.get("to_address"),
            amount: row.get("amount"),
        }
    }
}

/// A signed pending change to one `(ticker, address)` balance row. Deltas net out in memory
/// before they are applied, so one flush issues at most one statement per pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbBalanceDelta {
    pub ticker: String,
    pub address: String,
    pub avail: i128,
    pub trans: i128,
    pub total: i128,
}
