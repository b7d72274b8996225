use std::collections::HashMap;

use refinery::embed_migrations;
use satstream_postgres::deadpool_postgres::GenericClient;
use satstream_postgres::tokio_postgres::{types::ToSql, Client};
use satstream_postgres::types::{PgNumericU128, PgNumericU64};
use satstream_postgres::FromPgRow;

use crate::db::chunk_insert_values_param_str;

use super::models::{DbBalanceDelta, DbOperation, DbToken};

embed_migrations!("../../migrations/brc20");
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

pub async fn get_chain_tip<T: GenericClient>(client: &T) -> Result<Option<u64>, String> {
    let row = client
        .query_opt("SELECT block_height FROM chain_tip", &[])
        .await
        .map_err(|e| format!("brc20 get_chain_tip: {e}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let height: Option<PgNumericU64> = row.get("block_height");
    Ok(height.map(|h| h.0))
}

pub async fn update_chain_tip<T: GenericClient>(
    block_height: Option<u64>,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "UPDATE chain_tip SET block_height = $1",
            &[&block_height.map(PgNumericU64)],
        )
        .await
        .map_err(|e| format!("brc20 update_chain_tip: {e}"))?;
    Ok(())
}

//
// Reads used by the interpreter
//

pub async fn get_token<T: GenericClient>(
    ticker: &str,
    client: &T,
) -> Result<Option<DbToken>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM tokens WHERE ticker = $1",
            &[&ticker.to_string()],
        )
        .await
        .map_err(|e| format!("get_token: {e}"))?;
    Ok(row.map(|r| DbToken::from_pg_row(&r)))
}

pub async fn get_token_minted_supply<T: GenericClient>(
    ticker: &str,
    client: &T,
) -> Result<Option<u128>, String> {
    let row = client
        .query_opt(
            "SELECT minted_supply FROM tokens WHERE ticker = $1",
            &[&ticker.to_string()],
        )
        .await
        .map_err(|e| format!("get_token_minted_supply: {e}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let supply: PgNumericU128 = row.get("minted_supply");
    Ok(Some(supply.0))
}

pub async fn get_token_available_balance_for_address<T: GenericClient>(
    ticker: &str,
    address: &str,
    client: &T,
) -> Result<Option<u128>, String> {
    let row = client
        .query_opt(
            "SELECT avail_balance FROM balances WHERE ticker = $1 AND address = $2",
            &[&ticker.to_string(), &address.to_string()],
        )
        .await
        .map_err(|e| format!("get_token_available_balance_for_address: {e}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let balance: PgNumericU128 = row.get("avail_balance");
    Ok(Some(balance.0))
}

/// The outstanding transfer inscription on a sat, if its transferable amount has not been sent
/// yet. A transfer inscription can be sent at most once.
pub async fn get_unsent_token_transfer<T: GenericClient>(
    ordinal_number: u64,
    client: &T,
) -> Result<Option<DbOperation>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM operations
            WHERE ordinal_number = $1 AND operation = 'transfer'
            AND NOT EXISTS (SELECT 1 FROM operations WHERE ordinal_number = $1 AND operation = 'transfer_send')
            LIMIT 1",
            &[&PgNumericU64(ordinal_number)],
        )
        .await
        .map_err(|e| format!("get_unsent_token_transfer: {e}"))?;
    Ok(row.map(|r| DbOperation::from_pg_row(&r)))
}

//
// Inserts
//

pub async fn insert_tokens<T: GenericClient>(
    tokens: &Vec<DbToken>,
    client: &T,
) -> Result<(), String> {
    for chunk in tokens.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.ticker);
            params.push(&row.display_ticker);
            params.push(&row.inscription_id);
            params.push(&row.inscription_number);
            params.push(&row.block_height);
            params.push(&row.block_hash);
            params.push(&row.tx_id);
            params.push(&row.tx_index);
            params.push(&row.address);
            params.push(&row.max);
            params.push(&row.limit);
            params.push(&row.decimals);
            params.push(&row.self_mint);
            params.push(&row.minted_supply);
            params.push(&row.tx_count);
            params.push(&row.timestamp);
        }
        client
            .query(
                &format!("INSERT INTO tokens
                    (ticker, display_ticker, inscription_id, inscription_number, block_height, block_hash, tx_id, tx_index,
                    address, max, \"limit\", decimals, self_mint, minted_supply, tx_count, timestamp)
                    VALUES {}
                    ON CONFLICT (ticker) DO NOTHING", chunk_insert_values_param_str(chunk.len(), 16)),
                &params,
            )
            .await
            .map_err(|e| format!("insert_tokens: {e}"))?;
    }
    Ok(())
}

pub async fn insert_operations<T: GenericClient>(
    operations: &Vec<DbOperation>,
    client: &T,
) -> Result<(), String> {
    for chunk in operations.chunks(500) {
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![];
        for row in chunk.iter() {
            params.push(&row.ticker);
            params.push(&row.operation);
            params.push(&row.inscription_id);
            params.push(&row.inscription_number);
            params.push(&row.ordinal_number);
            params.push(&row.block_height);
            params.push(&row.block_hash);
            params.push(&row.tx_id);
            params.push(&row.tx_index);
            params.push(&row.output);
            params.push(&row.offset);
            params.push(&row.timestamp);
            params.push(&row.address);
            params.push(&row.to_address);
            params.push(&row.amount);
        }
        client
            .query(
                &format!("INSERT INTO operations
                    (ticker, operation, inscription_id, inscription_number, ordinal_number, block_height, block_hash,
                    tx_id, tx_index, output, \"offset\", timestamp, address, to_address, amount)
                    VALUES {}
                    ON CONFLICT (inscription_id, operation) DO NOTHING", chunk_insert_values_param_str(chunk.len(), 15)),
                &params,
            )
            .await
            .map_err(|e| format!("insert_operations: {e}"))?;
    }
    Ok(())
}

//
// Balances
//

/// Applies netted balance deltas. Pure credits upsert; any delta with a negative component must
/// land on an existing row, you cannot lose balance you never had. The schema's CHECK constraints
/// reject any result that would break `avail + trans = total >= 0`.
pub async fn apply_balance_deltas<T: GenericClient>(
    deltas: &Vec<DbBalanceDelta>,
    client: &T,
) -> Result<(), String> {
    for delta in deltas.iter() {
        if delta.avail == 0 && delta.trans == 0 && delta.total == 0 {
            continue;
        }
        if delta.avail >= 0 && delta.trans >= 0 && delta.total >= 0 {
            client
                .execute(
                    "INSERT INTO balances (ticker, address, avail_balance, trans_balance, total_balance)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (ticker, address) DO UPDATE SET
                        avail_balance = balances.avail_balance + EXCLUDED.avail_balance,
                        trans_balance = balances.trans_balance + EXCLUDED.trans_balance,
                        total_balance = balances.total_balance + EXCLUDED.total_balance",
                    &[
                        &delta.ticker,
                        &delta.address,
                        &PgNumericU128(delta.avail as u128),
                        &PgNumericU128(delta.trans as u128),
                        &PgNumericU128(delta.total as u128),
                    ],
                )
                .await
                .map_err(|e| format!("apply_balance_deltas: {e}"))?;
        } else {
            let avail_add = PgNumericU128(delta.avail.max(0) as u128);
            let avail_sub = PgNumericU128((-delta.avail).max(0) as u128);
            let trans_add = PgNumericU128(delta.trans.max(0) as u128);
            let trans_sub = PgNumericU128((-delta.trans).max(0) as u128);
            let total_add = PgNumericU128(delta.total.max(0) as u128);
            let total_sub = PgNumericU128((-delta.total).max(0) as u128);
            let updated = client
                .execute(
                    "UPDATE balances SET
                        avail_balance = avail_balance + $3 - $4,
                        trans_balance = trans_balance + $5 - $6,
                        total_balance = total_balance + $7 - $8
                    WHERE ticker = $1 AND address = $2",
                    &[
                        &delta.ticker,
                        &delta.address,
                        &avail_add,
                        &avail_sub,
                        &trans_add,
                        &trans_sub,
                        &total_add,
                        &total_sub,
                    ],
                )
                .await
                .map_err(|e| format!("apply_balance_deltas: {e}"))?;
            if updated != 1 {
                return Err(format!(
                    "apply_balance_deltas: debit for unknown balance {}:{}",
                    delta.ticker, delta.address
                ));
            }
        }
    }
    Ok(())
}

pub async fn update_token_minted_supplies<T: GenericClient>(
    deltas: &HashMap<String, u128>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    let operator = if increment { "+" } else { "-" };
    for (ticker, delta) in deltas.iter() {
        client
            .execute(
                &format!(
                    "UPDATE tokens SET minted_supply = minted_supply {operator} $2 WHERE ticker = $1"
                ),
                &[ticker, &PgNumericU128(*delta)],
            )
            .await
            .map_err(|e| format!("update_token_minted_supplies: {e}"))?;
    }
    Ok(())
}

pub async fn update_token_tx_counts<T: GenericClient>(
    deltas: &HashMap<String, u64>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    let operator = if increment { "+" } else { "-" };
    for (ticker, delta) in deltas.iter() {
        client
            .execute(
                &format!("UPDATE tokens SET tx_count = tx_count {operator} $2 WHERE ticker = $1"),
                &[ticker, &(*delta as i64)],
            )
            .await
            .map_err(|e| format!("update_token_tx_counts: {e}"))?;
    }
    Ok(())
}

pub async fn insert_balance_history_snapshots<T: GenericClient>(
    pairs: &Vec<(String, String)>,
    block_height: u64,
    client: &T,
) -> Result<(), String> {
    for (ticker, address) in pairs.iter() {
        client
            .execute(
                "INSERT INTO balances_history (ticker, address, block_height, avail_balance, trans_balance, total_balance)
                SELECT ticker, address, $3, avail_balance, trans_balance, total_balance
                FROM balances WHERE ticker = $1 AND address = $2
                ON CONFLICT (ticker, address, block_height) DO UPDATE SET
                    avail_balance = EXCLUDED.avail_balance,
                    trans_balance = EXCLUDED.trans_balance,
                    total_balance = EXCLUDED.total_balance",
                &[ticker, address, &PgNumericU64(block_height)],
            )
            .await
            .map_err(|e| format!("insert_balance_history_snapshots: {e}"))?;
    }
    Ok(())
}

//
// Counters
//

async fn update_count<T: GenericClient>(
    sql_upsert: &str,
    sql_decrement: &str,
    sql_cleanup: &str,
    params: &[&(dyn ToSql + Sync)],
    increment: bool,
    client: &T,
) -> Result<(), String> {
    if increment {
        client
            .execute(sql_upsert, params)
            .await
            .map_err(|e| format!("update_count: {e}"))?;
    } else {
        client
            .execute(sql_decrement, params)
            .await
            .map_err(|e| format!("update_count: {e}"))?;
        client
            .execute(sql_cleanup, &[])
            .await
            .map_err(|e| format!("update_count cleanup: {e}"))?;
    }
    Ok(())
}

pub async fn update_operation_counts<T: GenericClient>(
    deltas: &HashMap<String, i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for (operation, delta) in deltas.iter() {
        update_count(
            "INSERT INTO counts_by_operation (operation, count) VALUES ($1, $2)
            ON CONFLICT (operation) DO UPDATE SET count = counts_by_operation.count + EXCLUDED.count",
            "UPDATE counts_by_operation SET count = count - $2 WHERE operation = $1",
            "DELETE FROM counts_by_operation WHERE count = 0",
            &[operation, delta],
            increment,
            client,
        )
        .await?;
    }
    Ok(())
}

pub async fn update_address_operation_counts<T: GenericClient>(
    deltas: &HashMap<(String, String), i32>,
    increment: bool,
    client: &T,
) -> Result<(), String> {
    for ((address, operation), delta) in deltas.iter() {
        update_count(
            "INSERT INTO counts_by_address_operation (address, operation, count) VALUES ($1, $2, $3)
            ON CONFLICT (address, operation) DO UPDATE SET count = counts_by_address_operation.count + EXCLUDED.count",
            "UPDATE counts_by_address_operation SET count = count - $3 WHERE address = $1 AND operation = $2",
            "DELETE FROM counts_by_address_operation WHERE count = 0",
            &[address, operation, delta],
            increment,
            client,
        )
        .await?;
    }
    Ok(())
}

//
// Rollback
//

pub async fn get_operations_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<DbOperation>, String> {
    let rows = client
        .query(
            "SELECT * FROM operations WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_operations_at_block: {e}"))?;
    Ok(rows.iter().map(|r| DbOperation::from_pg_row(r)).collect())
}

pub async fn delete_operations_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM operations WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_operations_at_block: {e}"))?;
    Ok(())
}

pub async fn delete_tokens_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM tokens WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_tokens_at_block: {e}"))?;
    Ok(())
}

pub async fn get_balance_history_pairs_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<Vec<(String, String)>, String> {
    let rows = client
        .query(
            "SELECT ticker, address FROM balances_history WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_balance_history_pairs_at_block: {e}"))?;
    Ok(rows
        .iter()
        .map(|r| (r.get("ticker"), r.get("address")))
        .collect())
}

pub async fn get_previous_balance_snapshot<T: GenericClient>(
    ticker: &str,
    address: &str,
    block_height: u64,
    client: &T,
) -> Result<Option<(u128, u128, u128)>, String> {
    let row = client
        .query_opt(
            "SELECT avail_balance, trans_balance, total_balance FROM balances_history
            WHERE ticker = $1 AND address = $2 AND block_height < $3
            ORDER BY block_height DESC LIMIT 1",
            &[
                &ticker.to_string(),
                &address.to_string(),
                &PgNumericU64(block_height),
            ],
        )
        .await
        .map_err(|e| format!("get_previous_balance_snapshot: {e}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let avail: PgNumericU128 = row.get("avail_balance");
    let trans: PgNumericU128 = row.get("trans_balance");
    let total: PgNumericU128 = row.get("total_balance");
    Ok(Some((avail.0, trans.0, total.0)))
}

pub async fn upsert_balance_absolute<T: GenericClient>(
    ticker: &str,
    address: &str,
    avail: u128,
    trans: u128,
    total: u128,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "INSERT INTO balances (ticker, address, avail_balance, trans_balance, total_balance)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ticker, address) DO UPDATE SET
                avail_balance = EXCLUDED.avail_balance,
                trans_balance = EXCLUDED.trans_balance,
                total_balance = EXCLUDED.total_balance",
            &[
                &ticker.to_string(),
                &address.to_string(),
                &PgNumericU128(avail),
                &PgNumericU128(trans),
                &PgNumericU128(total),
            ],
        )
        .await
        .map_err(|e| format!("upsert_balance_absolute: {e}"))?;
    Ok(())
}

pub async fn delete_balance<T: GenericClient>(
    ticker: &str,
    address: &str,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM balances WHERE ticker = $1 AND address = $2",
            &[&ticker.to_string(), &address.to_string()],
        )
        .await
        .map_err(|e| format!("delete_balance: {e}"))?;
    Ok(())
}

pub async fn delete_balances_history_at_block<T: GenericClient>(
    block_height: u64,
    client: &T,
) -> Result<(), String> {
    client
        .execute(
            "DELETE FROM balances_history WHERE block_height = $1",
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("delete_balances_history_at_block: {e}"))?;
    Ok(())
}
