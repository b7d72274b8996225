use satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream_postgres::tokio_postgres::Row;
use satstream_postgres::FromPgRow;

use super::DbLocation;

/// The single current-location projection row for a sat. Overwritten in place on every apply,
/// restored from the `locations` history on rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCurrentLocation {
    pub ordinal_number: PgNumericU64,
    pub block_height: PgNumericU64,
    pub tx_index: PgBigIntU32,
    pub tx_id: String,
    pub address: Option<String>,
    pub output: String,
    pub offset: Option<PgNumericU64>,
}

impl DbCurrentLocation {
    pub fn from_location(location: &DbLocation) -> Self {
        DbCurrentLocation {
            ordinal_number: location.ordinal_number,
            block_height: location.block_height,
            tx_index: location.tx_index,
            tx_id: location.tx_id.clone(),
            address: location.address.clone(),
            output: location.output.clone(),
            offset: location.offset,
        }
    }
}

impl FromPgRow for DbCurrentLocation {
    fn from_pg_row(row: &Row) -> Self {
        DbCurrentLocation {
            ordinal_number: row.get("ordinal_number"),
            block_height: row.get("block_height"),
            tx_index: row.get("tx_index"),
            tx_id: row.get("tx_id"),
            address: row.get("address"),
            output: row.get("output"),
            offset: row.get("offset"),
        }
    }
}
