use std::collections::{HashMap, HashSet};

use satstream_postgres::deadpool_postgres::Transaction;
use satstream_types::{BitcoinBlockData, OrdinalInscriptionRevealData, OrdinalOperation};

use crate::db::models::{
    DbCurrentLocation, DbInscription, DbInscriptionParent, DbInscriptionRecursion, DbLocation,
    DbSatoshi,
};
use crate::db::ordinals_pg;
use crate::try_info;
use crate::utils::Context;

use super::satoshi_tracking::{apply_transfer, rollback_block_transfers};

/// Pending reveal rows for a block, inserted in batches. The batch must be flushed before any
/// transfer of the block is applied, a transfer may move a sat inscribed earlier in the block.
#[derive(Default)]
struct RevealBatch {
    satoshis: Vec<DbSatoshi>,
    inscriptions: Vec<DbInscription>,
    locations: Vec<DbLocation>,
    parents: Vec<DbInscriptionParent>,
    recursions: Vec<DbInscriptionRecursion>,
    mime_type_counts: HashMap<String, i32>,
    rarity_counts: HashMap<String, i32>,
    type_counts: HashMap<String, i32>,
    address_counts: HashMap<String, i32>,
    genesis_address_counts: HashMap<String, i32>,
    recursive_counts: HashMap<bool, i32>,
}

impl RevealBatch {
    fn is_empty(&self) -> bool {
        self.inscriptions.is_empty()
    }

    fn push(
        &mut self,
        reveal: &OrdinalInscriptionRevealData,
        block: &BitcoinBlockData,
        tx_id: &str,
    ) -> Result<(), String> {
        let satoshi = DbSatoshi::from_reveal(reveal)?;
        let mut inscription = DbInscription::from_reveal(reveal, block, tx_id)?;
        let location = DbLocation::from_reveal(reveal, block, tx_id)?;
        let recursions = DbInscriptionRecursion::from_reveal(reveal)?;

        if !recursions.is_empty() {
            inscription.recursive = true;
        }
        *self
            .mime_type_counts
            .entry(inscription.mime_type.clone())
            .or_insert(0) += 1;
        *self.rarity_counts.entry(satoshi.rarity.clone()).or_insert(0) += 1;
        let type_key = if inscription.is_blessed() {
            "blessed"
        } else {
            "cursed"
        };
        *self.type_counts.entry(type_key.to_string()).or_insert(0) += 1;
        if let Some(address) = &inscription.address {
            *self.address_counts.entry(address.clone()).or_insert(0) += 1;
            *self
                .genesis_address_counts
                .entry(address.clone())
                .or_insert(0) += 1;
        }
        *self
            .recursive_counts
            .entry(inscription.recursive)
            .or_insert(0) += 1;

        self.satoshis.push(satoshi);
        self.inscriptions.push(inscription);
        self.locations.push(location);
        self.parents.append(&mut DbInscriptionParent::from_reveal(reveal));
        self.recursions.extend(recursions);
        Ok(())
    }

    async fn flush(&mut self, db_tx: &Transaction<'_>) -> Result<(), String> {
        if self.is_empty() {
            return Ok(());
        }
        ordinals_pg::insert_satoshis(&self.satoshis, db_tx).await?;
        ordinals_pg::insert_inscriptions(&self.inscriptions, db_tx).await?;
        ordinals_pg::insert_locations(&self.locations, db_tx).await?;
        ordinals_pg::upsert_current_locations(&current_locations_for(&self.locations), db_tx)
            .await?;
        ordinals_pg::insert_inscription_parents(&self.parents, db_tx).await?;
        ordinals_pg::insert_inscription_recursions(&self.recursions, db_tx).await?;
        ordinals_pg::update_counts_by_mime_type(&self.mime_type_counts, true, db_tx).await?;
        ordinals_pg::update_counts_by_sat_rarity(&self.rarity_counts, true, db_tx).await?;
        ordinals_pg::update_counts_by_type(&self.type_counts, true, db_tx).await?;
        ordinals_pg::update_counts_by_address(&self.address_counts, true, db_tx).await?;
        ordinals_pg::update_counts_by_genesis_address(&self.genesis_address_counts, true, db_tx)
            .await?;
        ordinals_pg::update_counts_by_recursive(&self.recursive_counts, true, db_tx).await?;
        *self = RevealBatch::default();
        Ok(())
    }
}

/// One `current_locations` upsert row per sat, keeping the last location pushed for it. A single
/// statement cannot update the same row twice.
fn current_locations_for(locations: &Vec<DbLocation>) -> Vec<DbCurrentLocation> {
    let mut seen = HashSet::new();
    let mut deduped = vec![];
    for location in locations.iter().rev() {
        if seen.insert(location.ordinal_number) {
            deduped.push(DbCurrentLocation::from_location(location));
        }
    }
    deduped.reverse();
    deduped
}

/// Applies every ordinal operation of a block, in ascending `(tx_index, intra-tx order)`, and
/// writes the per-block counts row. Runs inside the block's ordinals transaction.
pub async fn index_block_ordinals(
    block: &BitcoinBlockData,
    db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    let mut batch = RevealBatch::default();
    let mut reveal_count: i32 = 0;
    let mut block_transfer_index: i32 = 0;

    for tx in block.transactions.iter() {
        let tx_id = &tx.transaction_identifier.hash;
        for op in tx.ordinal_operations.iter() {
            match op {
                OrdinalOperation::InscriptionRevealed(reveal) => {
                    batch.push(reveal, block, tx_id)?;
                    reveal_count += 1;
                    try_info!(
                        ctx,
                        "Inscription reveal {} (#{}) detected on Satoshi {} at block #{}",
                        reveal.inscription_id,
                        reveal.inscription_number.jubilee,
                        reveal.ordinal_number,
                        block.block_identifier.index
                    );
                }
                OrdinalOperation::InscriptionTransferred(transfer) => {
                    batch.flush(db_tx).await?;
                    apply_transfer(
                        transfer,
                        block,
                        tx_id,
                        &mut block_transfer_index,
                        db_tx,
                        ctx,
                    )
                    .await?;
                }
            }
        }
    }
    batch.flush(db_tx).await?;

    ordinals_pg::insert_counts_by_block(
        block.block_identifier.index,
        &block.block_identifier.hash,
        reveal_count,
        block.timestamp,
        db_tx,
    )
    .await?;
    Ok(())
}

/// Exact inverse of `index_block_ordinals` for a previously applied block.
pub async fn rollback_block_ordinals(
    block_height: u64,
    db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    // Reveal counters have to be captured before the inscription rows are deleted.
    let counters = ordinals_pg::get_reveal_counters_at_block(block_height, db_tx).await?;
    let mut mime_type_counts = HashMap::new();
    let mut rarity_counts = HashMap::new();
    let mut type_counts = HashMap::new();
    let mut address_counts = HashMap::new();
    let mut genesis_address_counts = HashMap::new();
    let mut recursive_counts = HashMap::new();
    for row in counters.iter() {
        *mime_type_counts.entry(row.mime_type.clone()).or_insert(0) += 1;
        *rarity_counts.entry(row.rarity.clone()).or_insert(0) += 1;
        let type_key = if row.classic_number >= 0 {
            "blessed"
        } else {
            "cursed"
        };
        *type_counts.entry(type_key.to_string()).or_insert(0) += 1;
        if let Some(address) = &row.address {
            *address_counts.entry(address.clone()).or_insert(0) += 1;
            *genesis_address_counts.entry(address.clone()).or_insert(0) += 1;
        }
        *recursive_counts.entry(row.recursive).or_insert(0) += 1;
    }

    let transfer_sats = rollback_block_transfers(block_height, db_tx, ctx).await?;

    ordinals_pg::update_counts_by_mime_type(&mime_type_counts, false, db_tx).await?;
    ordinals_pg::update_counts_by_sat_rarity(&rarity_counts, false, db_tx).await?;
    ordinals_pg::update_counts_by_type(&type_counts, false, db_tx).await?;
    ordinals_pg::update_counts_by_address(&address_counts, false, db_tx).await?;
    ordinals_pg::update_counts_by_genesis_address(&genesis_address_counts, false, db_tx).await?;
    ordinals_pg::update_counts_by_recursive(&recursive_counts, false, db_tx).await?;

    let mut orphan_candidates = ordinals_pg::delete_inscriptions_at_block(block_height, db_tx).await?;
    orphan_candidates.extend(transfer_sats);
    orphan_candidates.sort_unstable();
    orphan_candidates.dedup();
    ordinals_pg::delete_orphan_satoshis(&orphan_candidates, db_tx).await?;
    ordinals_pg::delete_counts_by_block(block_height, db_tx).await?;

    try_info!(ctx, "Block #{block_height} ordinal activity rolled back");
    Ok(())
}

#[cfg(test)]
mod test {
    use satstream_postgres::deadpool_postgres::Transaction;
    use satstream_types::{BitcoinBlockData, OrdinalOperation};

    use crate::core::test_utils::{
        make_block, make_reveal, make_transfer, make_tx, test_tx_hash,
    };
    use crate::db::ordinals_pg;
    use crate::db::{pg_reset_db, pg_test_connection, pg_test_connection_pool};
    use crate::utils::Context;
    use satstream_postgres::{pg_begin, pg_pool_client};

    use super::{index_block_ordinals, rollback_block_ordinals};

    async fn apply_block(block: &BitcoinBlockData, ctx: &Context) -> Result<(), String> {
        let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
        let db_tx = pg_begin(&mut client).await?;
        index_block_ordinals(block, &db_tx, ctx).await?;
        db_tx.commit().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn rollback_block(block_height: u64, ctx: &Context) -> Result<(), String> {
        let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
        let db_tx = pg_begin(&mut client).await?;
        rollback_block_ordinals(block_height, &db_tx, ctx).await?;
        db_tx.commit().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn count_query(db_tx: &Transaction<'_>, statement: &str) -> i64 {
        db_tx.query_one(statement, &[]).await.unwrap().get(0)
    }

    #[tokio::test]
    async fn transfers_within_one_block_chain_current_location() -> Result<(), String> {
        let ctx = Context::empty();
        let ordinal_number: u64 = 257418248345364;
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        ordinals_pg::migrate(&mut pg_client).await?;
        let result = async {
            let reveal_tx = test_tx_hash(1);
            let inscription_id = format!("{reveal_tx}i0");
            apply_block(
                &make_block(
                    775617,
                    vec![make_tx(
                        &reveal_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_reveal(
                            &inscription_id,
                            0,
                            ordinal_number,
                            "address_a",
                            0,
                        ))],
                    )],
                ),
                &ctx,
            )
            .await?;

            // Two transfers of the same sat within one block, in ascending tx order.
            let hop_one_tx = test_tx_hash(2);
            let hop_two_tx = test_tx_hash(3);
            apply_block(
                &make_block(
                    775618,
                    vec![
                        make_tx(
                            &hop_one_tx,
                            vec![OrdinalOperation::InscriptionTransferred(make_transfer(
                                ordinal_number,
                                "address_b",
                                &format!("{reveal_tx}:0:0"),
                                &hop_one_tx,
                                30,
                            ))],
                        ),
                        make_tx(
                            &hop_two_tx,
                            vec![OrdinalOperation::InscriptionTransferred(make_transfer(
                                ordinal_number,
                                "address_c",
                                &format!("{hop_one_tx}:0:0"),
                                &hop_two_tx,
                                42,
                            ))],
                        ),
                    ],
                ),
                &ctx,
            )
            .await?;

            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            let current = ordinals_pg::get_current_location(ordinal_number, &db_tx)
                .await?
                .expect("sat should have a current location");
            assert_eq!(current.address, Some("address_c".to_string()));
            assert_eq!(current.block_height.0, 775618);
            assert_eq!(current.tx_index.0, 42);
            assert_eq!(current.output, format!("{hop_two_tx}:0"));

            // Genesis plus two transfers.
            let locations = count_query(
                &db_tx,
                "SELECT COUNT(*)::bigint FROM locations WHERE ordinal_number = 257418248345364",
            )
            .await;
            assert_eq!(locations, 3);

            let transfers = ordinals_pg::get_transfers_at_block(775618, &db_tx).await?;
            assert_eq!(transfers.len(), 2);
            assert_eq!(transfers[0].block_transfer_index, 0);
            assert_eq!(transfers[0].from_block_height.0, 775617);
            assert_eq!(transfers[1].block_transfer_index, 1);
            assert_eq!(transfers[1].from_tx_index.0, 30);
            assert_eq!(transfers[1].inscription_id, inscription_id);

            // Ownership counters followed the moves.
            let count_c = count_query(
                &db_tx,
                "SELECT count::bigint FROM counts_by_address WHERE address = 'address_c'",
            )
            .await;
            assert_eq!(count_c, 1);
            db_tx.commit().await.map_err(|e| e.to_string())?;
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn reinscriptions_share_the_sat_current_location() -> Result<(), String> {
        let ctx = Context::empty();
        let ordinal_number: u64 = 1050000000000000;
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        ordinals_pg::migrate(&mut pg_client).await?;
        let result = async {
            let first_tx = test_tx_hash(10);
            let second_tx = test_tx_hash(11);
            apply_block(
                &make_block(
                    775617,
                    vec![make_tx(
                        &first_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_reveal(
                            &format!("{first_tx}i0"),
                            -7,
                            ordinal_number,
                            "address_a",
                            0,
                        ))],
                    )],
                ),
                &ctx,
            )
            .await?;
            // Reinscribing the sat moves it to the new reveal's satpoint.
            apply_block(
                &make_block(
                    775618,
                    vec![make_tx(
                        &second_tx,
                        vec![OrdinalOperation::InscriptionRevealed(make_reveal(
                            &format!("{second_tx}i0"),
                            -1,
                            ordinal_number,
                            "address_a",
                            0,
                        ))],
                    )],
                ),
                &ctx,
            )
            .await?;

            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            let inscriptions = ordinals_pg::get_inscriptions_at_ordinal(ordinal_number, &db_tx).await?;
            assert_eq!(inscriptions.len(), 2);
            let current = ordinals_pg::get_current_location(ordinal_number, &db_tx)
                .await?
                .expect("sat should have a current location");
            assert_eq!(current.output, format!("{second_tx}:0"));
            assert_eq!(current.block_height.0, 775618);

            // The sat has one location row per reveal; the first inscription's history spans
            // both, the second one's only the latest.
            let locations = count_query(
                &db_tx,
                "SELECT COUNT(*)::bigint FROM locations WHERE ordinal_number = 1050000000000000",
            )
            .await;
            assert_eq!(locations, 2);
            let cursed = count_query(
                &db_tx,
                "SELECT count::bigint FROM counts_by_type WHERE type = 'cursed'",
            )
            .await;
            assert_eq!(cursed, 2);
            db_tx.commit().await.map_err(|e| e.to_string())?;
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }

    #[tokio::test]
    async fn rollback_restores_prior_block_state() -> Result<(), String> {
        let ctx = Context::empty();
        let _lock = crate::db::PG_TEST_LOCK.lock().await;
        let mut pg_client = pg_test_connection().await;
        ordinals_pg::migrate(&mut pg_client).await?;
        let result = async {
            for (block_height, seed, ordinal_number) in [
                (100u64, 20u64, 5_000_000_000u64),
                (101, 21, 10_000_000_000),
                (102, 22, 15_000_000_000),
            ] {
                let tx_hash = test_tx_hash(seed);
                apply_block(
                    &make_block(
                        block_height,
                        vec![make_tx(
                            &tx_hash,
                            vec![OrdinalOperation::InscriptionRevealed(make_reveal(
                                &format!("{tx_hash}i0"),
                                block_height as i64 - 100,
                                ordinal_number,
                                "address_a",
                                0,
                            ))],
                        )],
                    ),
                    &ctx,
                )
                .await?;
            }
            rollback_block(102, &ctx).await?;
            rollback_block(101, &ctx).await?;

            let mut client = pg_pool_client(&pg_test_connection_pool()).await?;
            let db_tx = pg_begin(&mut client).await?;
            assert_eq!(
                count_query(&db_tx, "SELECT COUNT(*)::bigint FROM inscriptions").await,
                1
            );
            assert_eq!(
                count_query(
                    &db_tx,
                    "SELECT COUNT(*)::bigint FROM counts_by_block WHERE block_height > 100"
                )
                .await,
                0
            );
            assert_eq!(
                count_query(
                    &db_tx,
                    "SELECT count::bigint FROM counts_by_mime_type WHERE mime_type = 'text/plain'"
                )
                .await,
                1
            );
            assert_eq!(
                count_query(
                    &db_tx,
                    "SELECT count::bigint FROM counts_by_address WHERE address = 'address_a'"
                )
                .await,
                1
            );
            assert_eq!(
                count_query(
                    &db_tx,
                    "SELECT COUNT(*)::bigint FROM current_locations WHERE ordinal_number > 5000000000"
                )
                .await,
                0
            );
            // The satoshi rows of the rolled back reveals are gone with them.
            assert_eq!(
                count_query(&db_tx, "SELECT COUNT(*)::bigint FROM satoshis").await,
                1
            );
            db_tx.commit().await.map_err(|e| e.to_string())?;
            Ok(())
        }
        .await;
        pg_reset_db(&mut pg_client).await?;
        result
    }
}
