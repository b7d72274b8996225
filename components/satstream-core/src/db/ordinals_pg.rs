use std::collections::HashMap;

use refinery::embed_migrations;
use satstream_postgres::deadpool_postgres::GenericClient;
use satstream_postgres::tokio_postgres::{types::ToSql, Client};
use satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream_postgres::FromPgRow;

use super::chunk_insert_values_param_str;
use super::models::{
    DbCurrentLocation, DbInscription, DbInscriptionParent, DbInscriptionRecursion,
    DbInscriptionTransfer, DbLocation, DbSatoshi,
};

embed_migrations!("../../migrations/ordinals");
pub async fn migrate(pg_client: &mut Client) -> Result<(), String> {
    return match migrations::runner()
        .set_migration_table_name("pgmigrations")
        .run_async(pg_client)
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("Error running pg migrations: {e}")),
    };
}

//
// Chain tip
//

pub async fn get_chain_tip<T: GenericClient>(client: &T) -> Result<Option<(u64, String)>, String> {
    let row = client
        .query_opt("SELECT block_height, block_hash FROM chain_tip", &[])
        .await
        .map_err(|e| format!("get_chain_tip: {e}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let height: Option<PgNumericU64> = row.get("block_height");
    let hash: Option<String> = row.get("block_hash");
    match (height, hash) {
        (Some(height), Some(hash)) => Ok(Some((height.0, hash))),
        _ => Ok(None),
    }
}

pub async fn update_chain_tip<T: GenericClient>(
    tip: Option<(u64, &str)>,
    client: &T,
) -> Result<(), String> {
    let (height, hash) = match tip {
        Some((height, hash)) => (Some(PgNumericU64(height)), Some(hash.to_string())),
        None => (None, None),
    };
    client
        .execute(
            "UPDATE chain_tip SET block_height = $1, block_hash = $2",
            &[&height, &hash],
        )
        .await
        .map_err(|e| format!("update_chain_tip: {e}"))?;
    Ok(())
}

/// Hash of a previously applied block, taken from the per-block counts projection.
pub async fn get_block_hash<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Option<String>, String> {
    let row = client
        .query_opt(
            "SELECT block_hash FROM counts_by_block WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_block_hash: {e}"))?;
    Ok(row.map(|r| r.get("block_hash")))
}

//
// Inserts
//

pub async fn insert_satoshis<T: GenericClient>(
    satoshis: &Vec<DbSatoshi>,
    client: &T,
) -> Result<(), String> {
    for chunk in satoshis.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.ordinal_number);
            params.push(&row.rarity);
            params.push(&row.coinbase_height);
        }
        client
            .query(
                &format!(
                    "INSERT INTO satoshis
                    (ordinal_number, rarity, coinbase_height)
                    VALUES {}
                    ON CONFLICT (ordinal_number) DO NOTHING",
                    chunk_insert_values_param_str(chunk.len(), 3)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_satoshis: {e}"))?;
    }
    Ok(())
}

/// Inserts new inscription rows. A conflict on an existing inscription id is a hard error, it
/// indicates upstream duplication or a replay without rollback.
pub async fn insert_inscriptions<T: GenericClient>(
    inscriptions: &Vec<DbInscription>,
    client: &T,
) -> Result<(), String> {
    for chunk in inscriptions.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.inscription_id);
            params.push(&row.ordinal_number);
            params.push(&row.number);
            params.push(&row.classic_number);
            params.push(&row.block_height);
            params.push(&row.block_hash);
            params.push(&row.tx_id);
            params.push(&row.tx_index);
            params.push(&row.address);
            params.push(&row.mime_type);
            params.push(&row.content_type);
            params.push(&row.content_length);
            params.push(&row.content);
            params.push(&row.fee);
            params.push(&row.curse_type);
            params.push(&row.recursive);
            params.push(&row.input_index);
            params.push(&row.pointer);
            params.push(&row.metadata);
            params.push(&row.metaprotocol);
            params.push(&row.delegate);
            params.push(&row.timestamp);
            params.push(&row.charms);
        }
        client
            .query(
                &format!(
                    "INSERT INTO inscriptions
                    (inscription_id, ordinal_number, number, classic_number, block_height,
                    block_hash, tx_id, tx_index, address, mime_type, content_type, content_length,
                    content, fee, curse_type, recursive, input_index, pointer, metadata,
                    metaprotocol, delegate, timestamp, charms)
                    VALUES {}",
                    chunk_insert_values_param_str(chunk.len(), 23)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_inscriptions: {e}"))?;
    }
    Ok(())
}

pub async fn insert_locations<T: GenericClient>(
    locations: &Vec<DbLocation>,
    client: &T,
) -> Result<(), String> {
    for chunk in locations.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.ordinal_number);
            params.push(&row.block_height);
            params.push(&row.tx_index);
            params.push(&row.tx_id);
            params.push(&row.block_hash);
            params.push(&row.address);
            params.push(&row.output);
            params.push(&row.offset);
            params.push(&row.prev_output);
            params.push(&row.prev_offset);
            params.push(&row.value);
            params.push(&row.transfer_type);
            params.push(&row.timestamp);
        }
        client
            .query(
                &format!(
                    "INSERT INTO locations
                    (ordinal_number, block_height, tx_index, tx_id, block_hash, address, output,
                    \"offset\", prev_output, prev_offset, value, transfer_type, timestamp)
                    VALUES {}
                    ON CONFLICT (ordinal_number, block_height, tx_index) DO NOTHING",
                    chunk_insert_values_param_str(chunk.len(), 13)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_locations: {e}"))?;
    }
    Ok(())
}

/// Overwrites the current location projection for each sat. Callers must deduplicate rows by
/// ordinal number keeping the latest, a single statement cannot update one row twice.
pub async fn upsert_current_locations<T: GenericClient>(
    current_locations: &Vec<DbCurrentLocation>,
    client: &T,
) -> Result<(), String> {
    for chunk in current_locations.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.ordinal_number);
            params.push(&row.block_height);
            params.push(&row.tx_index);
            params.push(&row.tx_id);
            params.push(&row.address);
            params.push(&row.output);
            params.push(&row.offset);
        }
        client
            .query(
                &format!(
                    "INSERT INTO current_locations
                    (ordinal_number, block_height, tx_index, tx_id, address, output, \"offset\")
                    VALUES {}
                    ON CONFLICT (ordinal_number) DO UPDATE SET
                        block_height = EXCLUDED.block_height,
                        tx_index = EXCLUDED.tx_index,
                        tx_id = EXCLUDED.tx_id,
                        address = EXCLUDED.address,
                        output = EXCLUDED.output,
                        \"offset\" = EXCLUDED.\"offset\"",
                    chunk_insert_values_param_str(chunk.len(), 7)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("upsert_current_locations: {e}"))?;
    }
    Ok(())
}

pub async fn insert_inscription_transfers<T: GenericClient>(
    transfers: &Vec<DbInscriptionTransfer>,
    client: &T,
) -> Result<(), String> {
    for chunk in transfers.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.inscription_id);
            params.push(&row.number);
            params.push(&row.ordinal_number);
            params.push(&row.block_height);
            params.push(&row.tx_index);
            params.push(&row.block_hash);
            params.push(&row.from_block_height);
            params.push(&row.from_tx_index);
            params.push(&row.block_transfer_index);
        }
        client
            .query(
                &format!(
                    "INSERT INTO inscription_transfers
                    (inscription_id, number, ordinal_number, block_height, tx_index, block_hash,
                    from_block_height, from_tx_index, block_transfer_index)
                    VALUES {}",
                    chunk_insert_values_param_str(chunk.len(), 9)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_inscription_transfers: {e}"))?;
    }
    Ok(())
}

pub async fn insert_inscription_parents<T: GenericClient>(
    parents: &Vec<DbInscriptionParent>,
    client: &T,
) -> Result<(), String> {
    for chunk in parents.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.inscription_id);
            params.push(&row.parent_inscription_id);
        }
        client
            .query(
                &format!(
                    "INSERT INTO inscription_parents
                    (inscription_id, parent_inscription_id)
                    VALUES {}
                    ON CONFLICT (inscription_id, parent_inscription_id) DO NOTHING",
                    chunk_insert_values_param_str(chunk.len(), 2)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_inscription_parents: {e}"))?;
    }
    Ok(())
}

pub async fn insert_inscription_recursions<T: GenericClient>(
    recursions: &Vec<DbInscriptionRecursion>,
    client: &T,
) -> Result<(), String> {
    for chunk in recursions.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.inscription_id);
            params.push(&row.ref_inscription_id);
        }
        client
            .query(
                &format!(
                    "INSERT INTO inscription_recursions
                    (inscription_id, ref_inscription_id)
                    VALUES {}
                    ON CONFLICT (inscription_id, ref_inscription_id) DO NOTHING",
                    chunk_insert_values_param_str(chunk.len(), 2)
                ),
                &params,
            )
            .await
            .map_err(|e| format!("insert_inscription_recursions: {e}"))?;
    }
    Ok(())
}

//
// Counters
//

/// Inserts the per-block counts row, carrying the accumulated count forward from the previous
/// block so `inscription_count_accum` stays monotone.
pub async fn insert_counts_by_block<T: GenericClient>(
    block_height: u64,
    block_hash: &str,
    inscription_count: i32,
    timestamp: u32,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "INSERT INTO counts_by_block
            (block_height, block_hash, inscription_count, inscription_count_accum, timestamp)
            VALUES ($1, $2, $3, $3 + COALESCE((
                SELECT inscription_count_accum FROM counts_by_block
                WHERE block_height < $1
                ORDER BY block_height DESC LIMIT 1
            ), 0), $4)",
            &[
                &PgNumericU64(block_height),
                &block_hash.to_string(),
                &inscription_count,
                &PgBigIntU32(timestamp),
            ],
        )
        .await
        .map_err(|e| format!("insert_counts_by_block: {e}"))?;
    Ok(())
}

pub async fn delete_counts_by_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM counts_by_block WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_counts_by_block: {e}"))?;
    Ok(())
}

async fn increment_count<T: GenericClient>(
    table: &str,
    key_column: &str,
    key: &(dyn ToSql + Sync),
    delta: i32,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            &format!(
                "INSERT INTO {table} ({key_column}, count) VALUES ($1, $2)
                ON CONFLICT ({key_column}) DO UPDATE SET count = {table}.count + EXCLUDED.count"
            ),
            &[key, &delta],
        )
        .await
        .map_err(|e| format!("increment_count {table}: {e}"))?;
    Ok(())
}

/// Decrements a counter. The schema's CHECK constraint turns a decrement below zero into a SQL
/// error, which aborts the transaction: an apply/rollback imbalance must never be persisted.
/// Rows that reach zero are removed so a rollback restores the exact prior table contents.
async fn decrement_count<T: GenericClient>(
    table: &str,
    key_column: &str,
    key: &(dyn ToSql + Sync),
    delta: i32,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            &format!("UPDATE {table} SET count = count - $2 WHERE {key_column} = $1"),
            &[key, &delta],
        )
        .await
        .map_err(|e| format!("decrement_count {table}: {e}"))?;
    client
        .execute(&format!("DELETE FROM {table} WHERE count = 0"), &[])
        .await
        .map_err(|e| format!("decrement_count cleanup {table}: {e}"))?;
    Ok(())
}

pub async fn update_counts_by_mime_type<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (mime_type, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_mime_type", "mime_type", mime_type, *delta, client).await?;
        } else {
            decrement_count("counts_by_mime_type", "mime_type", mime_type, *delta, client).await?;
        }
    }
    Ok(())
}

pub async fn update_counts_by_sat_rarity<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (rarity, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_sat_rarity", "rarity", rarity, *delta, client).await?;
        } else {
            decrement_count("counts_by_sat_rarity", "rarity", rarity, *delta, client).await?;
        }
    }
    Ok(())
}

pub async fn update_counts_by_type<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (type_, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_type", "type", type_, *delta, client).await?;
        } else {
            decrement_count("counts_by_type", "type", type_, *delta, client).await?;
        }
    }
    Ok(())
}

pub async fn update_counts_by_address<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (address, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_address", "address", address, *delta, client).await?;
        } else {
            decrement_count("counts_by_address", "address", address, *delta, client).await?;
        }
    }
    Ok(())
}

pub async fn update_counts_by_genesis_address<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (address, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_genesis_address", "address", address, *delta, client)
                .await?;
        } else {
            decrement_count("counts_by_genesis_address", "address", address, *delta, client)
                .await?;
        }
    }
    Ok(())
}

pub async fn update_counts_by_recursive<T: GenericClient>(
    deltas: &HashMap<bool, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (recursive, delta) in deltas.iter() {
        if increment {
            increment_count("counts_by_recursive", "recursive", recursive, *delta, client).await?;
        } else {
            decrement_count("counts_by_recursive", "recursive", recursive, *delta, client).await?;
        }
    }
    Ok(())
}

//
// Reads used by the applier
//

pub async fn get_current_location<T: GenericClient>(
    ordinal_number: u64,
    client: &T,
) -> Result<Option<DbCurrentLocation>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM current_locations WHERE ordinal_number = $1",
            &[&PgNumericU64(ordinal_number)],
        )
        .await
        .map_err(|e| format!("get_current_location: {e}"))?;
    Ok(row.map(|r| DbCurrentLocation::from_pg_row(&r)))
}

/// All inscriptions currently sitting on a sat. Reinscriptions share the sat, so a transfer of
/// the sat moves every one of them.
pub async fn get_inscriptions_at_ordinal<T: GenericClient>(
    ordinal_number: u64,
    client: &T,
) -> Result<Vec<(String, i64)>, String> {
    let rows = client
        .query(
            "SELECT inscription_id, number FROM inscriptions
            WHERE ordinal_number = $1
            ORDER BY number ASC",
            &[&PgNumericU64(ordinal_number)],
        )
        .await
        .map_err(|e| format!("get_inscriptions_at_ordinal: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| (r.get("inscription_id"), r.get("number")))
        .collect())
}

pub async fn get_location<T: GenericClient>(
    ordinal_number: u64,
    block_height: u64,
    tx_index: u32,
    client: &T,
) -> Result<Option<DbLocation>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM locations
            WHERE ordinal_number = $1 AND block_height = $2 AND tx_index = $3",
            &[
                &PgNumericU64(ordinal_number),
                &PgNumericU64(block_height),
                &PgBigIntU32(tx_index),
            ],
        )
        .await
        .map_err(|e| format!("get_location: {e}"))?;
    Ok(row.map(|r| DbLocation::from_pg_row(&r)))
}

pub async fn get_latest_location_of_sat<T: GenericClient>(
    ordinal_number: u64,
    client: &T,
) -> Result<Option<DbLocation>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM locations
            WHERE ordinal_number = $1
            ORDER BY block_height DESC, tx_index DESC
            LIMIT 1",
            &[&PgNumericU64(ordinal_number)],
        )
        .await
        .map_err(|e| format!("get_latest_location_of_sat: {e}"))?;
    Ok(row.map(|r| DbLocation::from_pg_row(&r)))
}

pub async fn get_transfers_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<DbInscriptionTransfer>, String> {
    let rows = client
        .query(
            "SELECT * FROM inscription_transfers
            WHERE block_height = $1
            ORDER BY block_transfer_index ASC",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_transfers_at_block: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| DbInscriptionTransfer::from_pg_row(r))
        .collect())
}

pub struct DbRevealCounters {
    pub mime_type: String,
    pub rarity: String,
    pub classic_number: i64,
    pub address: Option<String>,
    pub recursive: bool,
}

/// Per-inscription counter dimensions for every inscription revealed at a block, used to reverse
/// the counter increments the block's apply performed.
pub async fn get_reveal_counters_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<DbRevealCounters>, String> {
    let rows = client
        .query(
            "SELECT i.mime_type, s.rarity, i.classic_number, i.address, i.recursive
            FROM inscriptions i
            INNER JOIN satoshis s ON s.ordinal_number = i.ordinal_number
            WHERE i.block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_reveal_counters_at_block: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| DbRevealCounters {
            mime_type: r.get("mime_type"),
            rarity: r.get("rarity"),
            classic_number: r.get("classic_number"),
            address: r.get("address"),
            recursive: r.get("recursive"),
        })
        .collect())
}

//
// Rollback deletes
//

pub async fn delete_inscriptions_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<u64>, String> {
    let rows = client
        .query(
            "DELETE FROM inscriptions WHERE block_height = $1 RETURNING ordinal_number",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_inscriptions_at_block: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| r.get::<&str, PgNumericU64>("ordinal_number").0)
        .collect())
}

pub async fn delete_locations_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<u64>, String> {
    let rows = client
        .query(
            "DELETE FROM locations WHERE block_height = $1 RETURNING ordinal_number",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_locations_at_block: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| r.get::<&str, PgNumericU64>("ordinal_number").0)
        .collect())
}

pub async fn delete_inscription_transfers_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<u64, String> {
    let deleted = client
        .execute(
            "DELETE FROM inscription_transfers WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_inscription_transfers_at_block: {e}"))?;
    Ok(deleted)
}

pub async fn delete_current_location<T: GenericClient>(
    ordinal_number: u64,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM current_locations WHERE ordinal_number = $1",
            &[&PgNumericU64(ordinal_number)],
        )
        .await
        .map_err(|e| format!("delete_current_location: {e}"))?;
    Ok(())
}

/// Removes satoshi rows left without any inscription or location. Sat rows created by a rolled
/// back reveal must disappear with it; rows referenced by earlier blocks stay.
pub async fn delete_orphan_satoshis<T: GenericClient>(
    ordinal_numbers: &Vec<u64>,
    client: &T,
) -> Result<(), String> {
    if ordinal_numbers.is_empty() {
        return Ok(());
    }
    let ordinals: Vec<PgNumericU64> = ordinal_numbers.iter().map(|o| PgNumericU64(*o)).collect();
    client
        .execute(
            "DELETE FROM satoshis s
            WHERE s.ordinal_number = ANY($1)
            AND NOT EXISTS (SELECT 1 FROM inscriptions i WHERE i.ordinal_number = s.ordinal_number)
            AND NOT EXISTS (SELECT 1 FROM locations l WHERE l.ordinal_number = s.ordinal_number)",
            &[&ordinals],
        )
        .await
        .map_err(|e| format!("delete_orphan_satoshis: {e}"))?;
    Ok(())
}
