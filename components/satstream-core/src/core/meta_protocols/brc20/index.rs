use std::collections::HashMap;

use config::OrdinalsBrc20Config;
use satstream_postgres::deadpool_postgres::Transaction;
use satstream_types::{
    BitcoinBlockData, BlockIdentifier, OrdinalInscriptionTransferData, OrdinalOperation,
    TransactionIdentifier,
};

use crate::try_info;
use crate::utils::Context;

use super::brc20_activation_height;
use super::brc20_pg;
use super::cache::Brc20MemoryCache;
use super::parser::parse_brc20_operation;
use super::u128_amount_to_decimals_str;
use super::verifier::{verify_brc20_operation, verify_brc20_transfers, VerifiedBrc20Operation};

async fn index_unverified_brc20_transfers(
    transfers: &Vec<(&TransactionIdentifier, &OrdinalInscriptionTransferData)>,
    block_identifier: &BlockIdentifier,
    timestamp: u32,
    brc20_cache: &mut Brc20MemoryCache,
    brc20_db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    let verified_brc20_transfers =
        verify_brc20_transfers(transfers, brc20_cache, brc20_db_tx, ctx).await?;
    for (_inscription_id, data, transfer, tx_identifier) in verified_brc20_transfers.into_iter() {
        brc20_cache
            .insert_token_transfer_send(
                &data,
                transfer,
                block_identifier,
                timestamp,
                tx_identifier,
                transfer.tx_index as u64,
                brc20_db_tx,
            )
            .await?;
        try_info!(
            ctx,
            "BRC-20 transfer_send {} {} ({} -> {}) at block {}",
            data.tick,
            data.amt,
            data.sender_address,
            data.receiver_address,
            block_identifier.index
        );
    }
    Ok(())
}

/// Interprets the BRC-20 operations of a Bitcoin block and writes the resulting ledger changes to
/// the brc20 DB transaction. Operations are processed strictly in ascending
/// `(tx_index, intra-tx order)`; pending sat transfers are settled before each new reveal so a
/// transfer_send of an inscription created earlier in the same block validates against the right
/// balances.
pub async fn index_block_and_insert_brc20_operations(
    block: &BitcoinBlockData,
    brc20_config: &OrdinalsBrc20Config,
    brc20_cache: &mut Brc20MemoryCache,
    brc20_db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    if block.block_identifier.index < brc20_activation_height(brc20_config) {
        return Ok(());
    }
    // Ordinal transfers that may be brc20 transfers. We group them into a vector to minimize
    // round trips to the db when analyzing them.
    let mut unverified_ordinal_transfers = vec![];

    // Check every transaction in the block. Look for BRC-20 operations.
    for tx in block.transactions.iter() {
        for op in tx.ordinal_operations.iter() {
            match op {
                OrdinalOperation::InscriptionRevealed(reveal) => {
                    let Some(parsed_brc20_operation) = parse_brc20_operation(reveal)? else {
                        brc20_cache.ignore_inscription(reveal.ordinal_number);
                        continue;
                    };
                    // First, verify any pending transfers as they may affect balances for the
                    // next operation.
                    index_unverified_brc20_transfers(
                        &unverified_ordinal_transfers,
                        &block.block_identifier,
                        block.timestamp,
                        brc20_cache,
                        brc20_db_tx,
                        ctx,
                    )
                    .await?;
                    unverified_ordinal_transfers.clear();
                    // Then continue with the new operation.
                    let Some(operation) = verify_brc20_operation(
                        &parsed_brc20_operation,
                        reveal,
                        &block.block_identifier,
                        brc20_config,
                        brc20_cache,
                        brc20_db_tx,
                        ctx,
                    )
                    .await?
                    else {
                        brc20_cache.ignore_inscription(reveal.ordinal_number);
                        continue;
                    };
                    match operation {
                        VerifiedBrc20Operation::TokenDeploy(token) => {
                            brc20_cache.insert_token_deploy(
                                &token,
                                reveal,
                                &block.block_identifier,
                                block.timestamp,
                                &tx.transaction_identifier,
                                reveal.tx_index as u64,
                            )?;
                            try_info!(
                                ctx,
                                "BRC-20 deploy {} ({}) at block {}",
                                token.tick,
                                token.address,
                                block.block_identifier.index
                            );
                        }
                        VerifiedBrc20Operation::TokenMint(balance) => {
                            let Some(token) =
                                brc20_cache.get_token(&balance.tick, brc20_db_tx).await?
                            else {
                                unreachable!();
                            };
                            brc20_cache
                                .insert_token_mint(
                                    &balance,
                                    reveal,
                                    &block.block_identifier,
                                    block.timestamp,
                                    &tx.transaction_identifier,
                                    reveal.tx_index as u64,
                                    brc20_db_tx,
                                )
                                .await?;
                            try_info!(
                                ctx,
                                "BRC-20 mint {} {} ({}) at block {}",
                                balance.tick,
                                u128_amount_to_decimals_str(balance.amt, token.decimals.0),
                                balance.address,
                                block.block_identifier.index
                            );
                        }
                        VerifiedBrc20Operation::TokenTransfer(balance) => {
                            let Some(token) =
                                brc20_cache.get_token(&balance.tick, brc20_db_tx).await?
                            else {
                                unreachable!();
                            };
                            brc20_cache
                                .insert_token_transfer(
                                    &balance,
                                    reveal,
                                    &block.block_identifier,
                                    block.timestamp,
                                    &tx.transaction_identifier,
                                    reveal.tx_index as u64,
                                    brc20_db_tx,
                                )
                                .await?;
                            try_info!(
                                ctx,
                                "BRC-20 transfer {} {} ({}) at block {}",
                                balance.tick,
                                u128_amount_to_decimals_str(balance.amt, token.decimals.0),
                                balance.address,
                                block.block_identifier.index
                            );
                        }
                        VerifiedBrc20Operation::TokenTransferSend(_) => {
                            unreachable!(
                                "BRC-20 token transfer send should never be generated on reveal"
                            )
                        }
                    }
                }
                OrdinalOperation::InscriptionTransferred(transfer) => {
                    unverified_ordinal_transfers.push((&tx.transaction_identifier, transfer));
                }
            }
        }
    }
    // Settle any dangling ordinal transfers.
    index_unverified_brc20_transfers(
        &unverified_ordinal_transfers,
        &block.block_identifier,
        block.timestamp,
        brc20_cache,
        brc20_db_tx,
        ctx,
    )
    .await?;
    // Write all changes to DB, then snapshot the balances the block touched.
    brc20_cache
        .flush_block_balances_history(block.block_identifier.index, brc20_db_tx)
        .await?;
    Ok(())
}

/// Reverses the BRC-20 effects of a block: operations are removed in reverse, token aggregates
/// are walked back, and balances are restored from the prior block's snapshots.
pub async fn rollback_block_brc20_operations(
    block_height: u64,
    brc20_db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    let operations = brc20_pg::get_operations_at_block(block_height, brc20_db_tx).await?;

    let mut operation_counts: HashMap<String, i32> = HashMap::new();
    let mut address_operation_counts: HashMap<(String, String), i32> = HashMap::new();
    let mut minted_supply_deltas: HashMap<String, u128> = HashMap::new();
    let mut tx_count_deltas: HashMap<String, u64> = HashMap::new();
    for op in operations.iter() {
        *operation_counts.entry(op.operation.clone()).or_insert(0) += 1;
        *address_operation_counts
            .entry((op.address.clone(), op.operation.clone()))
            .or_insert(0) += 1;
        match op.operation.as_str() {
            "mint" => {
                *minted_supply_deltas.entry(op.ticker.clone()).or_insert(0) += op.amount.0;
                *tx_count_deltas.entry(op.ticker.clone()).or_insert(0) += 1;
            }
            "transfer" | "transfer_send" => {
                *tx_count_deltas.entry(op.ticker.clone()).or_insert(0) += 1;
            }
            _ => {}
        };
    }
    brc20_pg::update_operation_counts(&operation_counts, false, brc20_db_tx).await?;
    brc20_pg::update_address_operation_counts(&address_operation_counts, false, brc20_db_tx)
        .await?;
    brc20_pg::update_token_minted_supplies(&minted_supply_deltas, false, brc20_db_tx).await?;
    brc20_pg::update_token_tx_counts(&tx_count_deltas, false, brc20_db_tx).await?;

    // Restore every touched balance to its state at the end of the previous block.
    let pairs = brc20_pg::get_balance_history_pairs_at_block(block_height, brc20_db_tx).await?;
    for (ticker, address) in pairs.iter() {
        match brc20_pg::get_previous_balance_snapshot(ticker, address, block_height, brc20_db_tx)
            .await?
        {
            Some((avail, trans, total)) => {
                brc20_pg::upsert_balance_absolute(ticker, address, avail, trans, total, brc20_db_tx)
                    .await?
            }
            None => brc20_pg::delete_balance(ticker, address, brc20_db_tx).await?,
        };
    }
    brc20_pg::delete_balances_history_at_block(block_height, brc20_db_tx).await?;
    brc20_pg::delete_operations_at_block(block_height, brc20_db_tx).await?;
    brc20_pg::delete_tokens_at_block(block_height, brc20_db_tx).await?;

    try_info!(ctx, "Block #{block_height} BRC-20 activity rolled back");
    Ok(())
}

#[cfg(test)]
mod test {
    use config::OrdinalsBrc20Config;
    use satstream_postgres::{pg_begin, pg_pool_client};
    use satstream_types::{BitcoinBlockData, OrdinalOperation};
    use serde_json::json;

    use crate::core::meta_protocols::brc20::brc20_pg;
    use crate::core::meta_protocols::brc20::cache::Brc20MemoryCache;
    use crate::core::test_utils::{
        make_block, make_brc20_reveal, make_transfer, make_tx, test_tx_hash,
    };
    use crate::db::{pg_reset_db, pg_test_config, pg_test_connection, pg_test_connection_pool};
    use crate::utils::Context;

    use super::{index_block_and_insert_brc20_operations, rollback_block_brc20_operations};

    const SCALE_18: u128 = 1_000_000_000_000_000_000;

    fn test_brc20_config() -> OrdinalsBrc20Config {
        OrdinalsBrc20Config {
            enabled: true,
            lru_cache_size: 50,
            genesis_block: 767430,
            self_mint_activation_block: 837090,
            db: pg_test_config(),
        }
    }

    async fn apply_block(
        block: &BitcoinBlockData,
        cache: &mut Brc20MemoryCache,
        ctx: &Context,
    ) -> Result<(), String> {
        let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
        let db_tx = pg_begin(&mut client).await?;
        index_block_and_insert_brc20_operations(block, &test_brc20_config(), cache, &db_tx, ctx)
            .await?;
        db_tx.commit().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn get_balance(
        ticker: &str,
        address: &str,
    ) -> Result<Option<(u128, u128, u128)>, String> {
        let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
        let db_tx = pg_begin(&mut client).await?;
        let row = db_tx
            .query_opt(
                "SELECT avail_balance, trans_balance, total_balance FROM balances
                WHERE ticker = $1 AND address = $2",
                &[&ticker.to_string(), &address.to_string()],
            )
            .await
            .map_err(|e| e.to_string())?;
        let result = row.map(|r| {
            let avail: satstream_postgres::types::PgNumericU128 = r.get("avail_balance");
            let trans: satstream_postgres::types::PgNumericU128 = r.get("trans_balance");
            let total: satstream_postgres::types::PgNumericU128 = r.get("total_balance");
            (avail.0, trans.0, total.0)
        });
        db_tx.commit().await.map_err(|e| e.to_string())?;
        Ok(result)
    }

    async fn count_operations(operation: &str) -> Result<i64, String> {
        let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
        let db_tx = pg_begin(&mut client).await?;
        let row = db_tx
            .query_one(
                "SELECT COUNT(*)::bigint AS count FROM operations WHERE operation = $1",
                &[&operation.to_string()],
            )
            .await
            .map_err(|e| e.to_string())?;
        let count = row.get("count");
        db_tx.commit().await.map_err(|e| e.to_string())?;
        Ok(count)
    }

    #[tokio::test]
    async fn deploy_mint_transfer_and_send_settle_balances() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        brc20_pg::migrate(&mut pg_client).await?;
        let result = async {
            let mut cache = Brc20MemoryCache::new(50);
            let address_a = "address_a";
            let address_b = "address_b";
            let deploy_tx = test_tx_hash(30);
            apply_block(
                &make_block(
                    767430,
                    vec![make_tx(
                        &deploy_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{deploy_tx}i0"),
                            0,
                            5_000_000_000,
                            address_a,
                            0,
                            json!({"p": "brc-20", "op": "deploy", "tick": "PEPE",
                                "max": "21000000", "lim": "21000000", "dec": "18"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            let mint_a_tx = test_tx_hash(31);
            apply_block(
                &make_block(
                    767431,
                    vec![make_tx(
                        &mint_a_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{mint_a_tx}i0"),
                            1,
                            6_000_000_000,
                            address_a,
                            0,
                            json!({"p": "brc-20", "op": "mint", "tick": "pepe", "amt": "10000"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            let mint_b_tx = test_tx_hash(32);
            apply_block(
                &make_block(
                    767432,
                    vec![make_tx(
                        &mint_b_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{mint_b_tx}i0"),
                            2,
                            7_000_000_000,
                            address_b,
                            0,
                            json!({"p": "brc-20", "op": "mint", "tick": "pepe", "amt": "10000"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            // A inscribes a transfer of 9000: the amount moves to the transferable balance.
            let transfer_tx = test_tx_hash(33);
            let transfer_sat: u64 = 8_000_000_000;
            apply_block(
                &make_block(
                    767433,
                    vec![make_tx(
                        &transfer_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{transfer_tx}i0"),
                            3,
                            transfer_sat,
                            address_a,
                            0,
                            json!({"p": "brc-20", "op": "transfer", "tick": "pepe", "amt": "9000"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            assert_eq!(
                get_balance("pepe", address_a).await?,
                Some((1000 * SCALE_18, 9000 * SCALE_18, 10000 * SCALE_18))
            );
            // The transfer inscription moves to B: sender debited, receiver credited.
            let send_tx = test_tx_hash(34);
            apply_block(
                &make_block(
                    767434,
                    vec![make_tx(
                        &send_tx,
                        vec![OrdinalOperation::InscriptionTransferred(make_transfer(
                            transfer_sat,
                            address_b,
                            &format!("{transfer_tx}:0:0"),
                            &send_tx,
                            0,
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;

            assert_eq!(
                get_balance("pepe", address_a).await?,
                Some((1000 * SCALE_18, 0, 1000 * SCALE_18))
            );
            assert_eq!(
                get_balance("pepe", address_b).await?,
                Some((19000 * SCALE_18, 0, 19000 * SCALE_18))
            );

            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            // Balances as of the end of block 767432 come from the history snapshots.
            assert_eq!(
                brc20_pg::get_previous_balance_snapshot("pepe", address_a, 767433, &db_tx).await?,
                Some((10000 * SCALE_18, 0, 10000 * SCALE_18))
            );
            let token = brc20_pg::get_token("pepe", &db_tx)
                .await?
                .expect("token should exist");
            assert_eq!(token.minted_supply.0, 20000 * SCALE_18);
            assert_eq!(token.tx_count, 5);
            assert_eq!(token.display_ticker, "PEPE");
            // Every transfer_send has exactly one paired transfer_receive.
            let send = db_tx
                .query_one(
                    "SELECT address, to_address FROM operations WHERE operation = 'transfer_send'",
                    &[],
                )
                .await
                .map_err(|e| e.to_string())?;
            assert_eq!(send.get::<&str, String>("address"), address_a);
            assert_eq!(send.get::<&str, Option<String>>("to_address"), Some(address_b.to_string()));
            let receive = db_tx
                .query_one(
                    "SELECT address FROM operations WHERE operation = 'transfer_receive'",
                    &[],
                )
                .await
                .map_err(|e| e.to_string())?;
            assert_eq!(receive.get::<&str, String>("address"), address_b);
            db_tx.commit().await.map_err(|e| e.to_string())?;
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn mint_clamps_to_remaining_supply_and_rejects_zero() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        brc20_pg::migrate(&mut pg_client).await?;
        let result = async {
            let mut cache = Brc20MemoryCache::new(50);
            let deploy_tx = test_tx_hash(40);
            apply_block(
                &make_block(
                    767430,
                    vec![make_tx(
                        &deploy_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{deploy_tx}i0"),
                            0,
                            5_000_000_000,
                            "address_a",
                            0,
                            json!({"p": "brc-20", "op": "deploy", "tick": "tick",
                                "max": "100", "lim": "50", "dec": "0"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            for (index, block_height) in [767431u64, 767432, 767433].iter().enumerate() {
                let mint_tx = test_tx_hash(41 + index as u64);
                apply_block(
                    &make_block(
                        *block_height,
                        vec![make_tx(
                            &mint_tx,
                            vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                                &format!("{mint_tx}i0"),
                                1 + index as i64,
                                6_000_000_000 + index as u64,
                                "address_a",
                                0,
                                json!({"p": "brc-20", "op": "mint", "tick": "tick", "amt": "50"}),
                            ))],
                        )],
                    ),
                    &mut cache,
                    &ctx,
                )
                .await?;
            }

            // The third mint clamps to zero and is rejected: no operation row, no tx_count bump.
            assert_eq!(count_operations("mint").await?, 2);
            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            let token = brc20_pg::get_token("tick", &db_tx)
                .await?
                .expect("token should exist");
            assert_eq!(token.minted_supply.0, 100);
            assert_eq!(token.tx_count, 3);
            db_tx.commit().await.map_err(|e| e.to_string())?;
            assert_eq!(
                get_balance("tick", "address_a").await?,
                Some((100, 0, 100))
            );
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn partial_mint_clamp_credits_remaining_supply() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        brc20_pg::migrate(&mut pg_client).await?;
        let result = async {
            let mut cache = Brc20MemoryCache::new(50);
            let deploy_tx = test_tx_hash(50);
            apply_block(
                &make_block(
                    767430,
                    vec![make_tx(
                        &deploy_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{deploy_tx}i0"),
                            0,
                            5_000_000_000,
                            "address_a",
                            0,
                            json!({"p": "brc-20", "op": "deploy", "tick": "tock",
                                "max": "80", "lim": "50", "dec": "0"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            for index in 0..2u64 {
                let mint_tx = test_tx_hash(51 + index);
                apply_block(
                    &make_block(
                        767431 + index,
                        vec![make_tx(
                            &mint_tx,
                            vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                                &format!("{mint_tx}i0"),
                                1 + index as i64,
                                6_000_000_000 + index,
                                "address_a",
                                0,
                                json!({"p": "brc-20", "op": "mint", "tick": "tock", "amt": "50"}),
                            ))],
                        )],
                    ),
                    &mut cache,
                    &ctx,
                )
                .await?;
            }

            // Second mint is clamped from 50 down to the 30 remaining.
            assert_eq!(get_balance("tock", "address_a").await?, Some((80, 0, 80)));
            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            let clamped = db_tx
                .query_one(
                    "SELECT amount FROM operations WHERE operation = 'mint'
                    ORDER BY block_height DESC LIMIT 1",
                    &[],
                )
                .await
                .map_err(|e| e.to_string())?;
            let amount: satstream_postgres::types::PgNumericU128 = clamped.get("amount");
            assert_eq!(amount.0, 30);
            db_tx.commit().await.map_err(|e| e.to_string())?;
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn transfer_inscription_can_only_be_sent_once() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        brc20_pg::migrate(&mut pg_client).await?;
        let result = async {
            let mut cache = Brc20MemoryCache::new(50);
            let transfer_sat: u64 = 8_000_000_000;
            let deploy_tx = test_tx_hash(60);
            let mint_tx = test_tx_hash(61);
            let transfer_tx = test_tx_hash(62);
            apply_block(
                &make_block(
                    767430,
                    vec![
                        make_tx(
                            &deploy_tx,
                            vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                                &format!("{deploy_tx}i0"),
                                0,
                                5_000_000_000,
                                "address_a",
                                0,
                                json!({"p": "brc-20", "op": "deploy", "tick": "once",
                                    "max": "1000", "lim": "1000", "dec": "0"}),
                            ))],
                        ),
                        make_tx(
                            &mint_tx,
                            vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                                &format!("{mint_tx}i0"),
                                1,
                                6_000_000_000,
                                "address_a",
                                1,
                                json!({"p": "brc-20", "op": "mint", "tick": "once", "amt": "1000"}),
                            ))],
                        ),
                        make_tx(
                            &transfer_tx,
                            vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                                &format!("{transfer_tx}i0"),
                                2,
                                transfer_sat,
                                "address_a",
                                2,
                                json!({"p": "brc-20", "op": "transfer", "tick": "once", "amt": "1000"}),
                            ))],
                        ),
                    ],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            let send_tx = test_tx_hash(63);
            apply_block(
                &make_block(
                    767431,
                    vec![make_tx(
                        &send_tx,
                        vec![OrdinalOperation::InscriptionTransferred(make_transfer(
                            transfer_sat,
                            "address_b",
                            &format!("{transfer_tx}:0:0"),
                            &send_tx,
                            0,
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            // Second hop of the same sat: the transferable amount has already been settled, so
            // this move is no longer a BRC-20 event.
            let second_hop_tx = test_tx_hash(64);
            apply_block(
                &make_block(
                    767432,
                    vec![make_tx(
                        &second_hop_tx,
                        vec![OrdinalOperation::InscriptionTransferred(make_transfer(
                            transfer_sat,
                            "address_c",
                            &format!("{send_tx}:0:0"),
                            &second_hop_tx,
                            0,
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;

            assert_eq!(count_operations("transfer_send").await?, 1);
            assert_eq!(count_operations("transfer_receive").await?, 1);
            assert_eq!(get_balance("once", "address_b").await?, Some((1000, 0, 1000)));
            assert_eq!(get_balance("once", "address_c").await?, None);
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn rollback_restores_prior_balances() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        brc20_pg::migrate(&mut pg_client).await?;
        let result = async {
            let mut cache = Brc20MemoryCache::new(50);
            let deploy_tx = test_tx_hash(70);
            apply_block(
                &make_block(
                    767430,
                    vec![make_tx(
                        &deploy_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{deploy_tx}i0"),
                            0,
                            5_000_000_000,
                            "address_a",
                            0,
                            json!({"p": "brc-20", "op": "deploy", "tick": "back",
                                "max": "1000", "lim": "1000", "dec": "0"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            let mint_tx = test_tx_hash(71);
            apply_block(
                &make_block(
                    767431,
                    vec![make_tx(
                        &mint_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{mint_tx}i0"),
                            1,
                            6_000_000_000,
                            "address_a",
                            0,
                            json!({"p": "brc-20", "op": "mint", "tick": "back", "amt": "600"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;
            let second_mint_tx = test_tx_hash(72);
            apply_block(
                &make_block(
                    767432,
                    vec![make_tx(
                        &second_mint_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_brc20_reveal(
                            &format!("{second_mint_tx}i0"),
                            2,
                            7_000_000_000,
                            "address_a",
                            0,
                            json!({"p": "brc-20", "op": "mint", "tick": "back", "amt": "300"}),
                        ))],
                    )],
                ),
                &mut cache,
                &ctx,
            )
            .await?;

            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            rollback_block_brc20_operations(767432, &db_tx, &ctx).await?;
            db_tx.commit().await.map_err(|e| e.to_string())?;

            assert_eq!(get_balance("back", "address_a").await?, Some((600, 0, 600)));
            assert_eq!(count_operations("mint").await?, 1);
            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            let token = brc20_pg::get_token("back", &db_tx)
                .await?
                .expect("token should exist");
            assert_eq!(token.minted_supply.0, 600);
            assert_eq!(token.tx_count, 2);
            db_tx.commit().await.map_err(|e| e.to_string())?;

            // Rolling the deploy itself back removes the token and its ledger.
            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            rollback_block_brc20_operations(767431, &db_tx, &ctx).await?;
            rollback_block_brc20_operations(767430, &db_tx, &ctx).await?;
            assert!(brc20_pg::get_token("back", &db_tx).await?.is_none());
            db_tx.commit().await.map_err(|e| e.to_string())?;
            assert_eq!(get_balance("back", "address_a").await?, None);
            assert_eq!(count_operations("deploy").await?, 0);
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }
}
