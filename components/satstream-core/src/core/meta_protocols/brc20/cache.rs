use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use lru::LruCache;
use satstream_postgres::deadpool_postgres::Transaction;
use satstream_postgres::types::{PgBigIntU32, PgNumericU128, PgNumericU64, PgSmallIntU8};
use satstream_types::{
    BlockIdentifier, OrdinalInscriptionRevealData, OrdinalInscriptionTransferData,
    TransactionIdentifier,
};

use crate::core::protocol::satoshi_tracking::parse_satpoint;

use super::brc20_pg;
use super::models::{DbBalanceDelta, DbOperation, DbToken};
use super::verifier::{
    VerifiedBrc20BalanceData, VerifiedBrc20TokenDeployData, VerifiedBrc20TransferData,
};

/// Keeps BRC-20 DB rows and balance deltas before they are written to Postgres. Use `flush` to
/// push them into the current block transaction.
pub struct Brc20DbCache {
    token_rows: Vec<DbToken>,
    operation_rows: Vec<DbOperation>,
    balance_deltas: Vec<DbBalanceDelta>,
    minted_supply_deltas: HashMap<String, u128>,
    tx_count_deltas: HashMap<String, u64>,
}

impl Brc20DbCache {
    fn new() -> Self {
        Brc20DbCache {
            token_rows: Vec::new(),
            operation_rows: Vec::new(),
            balance_deltas: Vec::new(),
            minted_supply_deltas: HashMap::new(),
            tx_count_deltas: HashMap::new(),
        }
    }

    fn push_balance_delta(&mut self, ticker: &str, address: &str, avail: i128, trans: i128) {
        self.balance_deltas.push(DbBalanceDelta {
            ticker: ticker.to_string(),
            address: address.to_string(),
            avail,
            trans,
            total: avail + trans,
        });
    }

    pub async fn flush(&mut self, db_tx: &Transaction<'_>) -> Result<(), String> {
        if !self.token_rows.is_empty() {
            brc20_pg::insert_tokens(&self.token_rows, db_tx).await?;
            self.token_rows.clear();
        }
        if !self.operation_rows.is_empty() {
            let mut operation_counts: HashMap<String, i32> = HashMap::new();
            let mut address_operation_counts: HashMap<(String, String), i32> = HashMap::new();
            for row in self.operation_rows.iter() {
                *operation_counts.entry(row.operation.clone()).or_insert(0) += 1;
                *address_operation_counts
                    .entry((row.address.clone(), row.operation.clone()))
                    .or_insert(0) += 1;
            }
            brc20_pg::insert_operations(&self.operation_rows, db_tx).await?;
            brc20_pg::update_operation_counts(&operation_counts, true, db_tx).await?;
            brc20_pg::update_address_operation_counts(&address_operation_counts, true, db_tx)
                .await?;
            self.operation_rows.clear();
        }
        if !self.balance_deltas.is_empty() {
            // Net the deltas per (ticker, address) so one flush issues one statement per pair.
            let mut netted: HashMap<(String, String), DbBalanceDelta> = HashMap::new();
            for delta in self.balance_deltas.drain(..) {
                let entry = netted
                    .entry((delta.ticker.clone(), delta.address.clone()))
                    .or_insert(DbBalanceDelta {
                        ticker: delta.ticker.clone(),
                        address: delta.address.clone(),
                        avail: 0,
                        trans: 0,
                        total: 0,
                    });
                entry.avail += delta.avail;
                entry.trans += delta.trans;
                entry.total += delta.total;
            }
            let deltas: Vec<DbBalanceDelta> = netted.into_values().collect();
            brc20_pg::apply_balance_deltas(&deltas, db_tx).await?;
        }
        if !self.minted_supply_deltas.is_empty() {
            brc20_pg::update_token_minted_supplies(&self.minted_supply_deltas, true, db_tx).await?;
            self.minted_supply_deltas.clear();
        }
        if !self.tx_count_deltas.is_empty() {
            brc20_pg::update_token_tx_counts(&self.tx_count_deltas, true, db_tx).await?;
            self.tx_count_deltas.clear();
        }
        Ok(())
    }
}

/// In-memory cache that keeps verified token data to avoid excessive reads to the database while
/// a block is interpreted.
pub struct Brc20MemoryCache {
    tokens: LruCache<String, DbToken>,
    token_minted_supplies: LruCache<String, u128>,
    token_addr_avail_balances: LruCache<String, u128>, // key format: "tick:address"
    unsent_transfers: LruCache<u64, DbOperation>,
    ignored_inscriptions: LruCache<u64, bool>,
    touched_balance_pairs: HashSet<(String, String)>,
    pub db_cache: Brc20DbCache,
}

impl Brc20MemoryCache {
    pub fn new(lru_size: usize) -> Self {
        Brc20MemoryCache {
            tokens: LruCache::new(NonZeroUsize::new(lru_size).unwrap()),
            token_minted_supplies: LruCache::new(NonZeroUsize::new(lru_size).unwrap()),
            token_addr_avail_balances: LruCache::new(NonZeroUsize::new(lru_size).unwrap()),
            unsent_transfers: LruCache::new(NonZeroUsize::new(lru_size).unwrap()),
            ignored_inscriptions: LruCache::new(NonZeroUsize::new(lru_size).unwrap()),
            touched_balance_pairs: HashSet::new(),
            db_cache: Brc20DbCache::new(),
        }
    }

    pub async fn get_token(
        &mut self,
        tick: &str,
        db_tx: &Transaction<'_>,
    ) -> Result<Option<DbToken>, String> {
        if let Some(token) = self.tokens.get(&tick.to_string()) {
            return Ok(Some(token.clone()));
        }
        self.handle_cache_miss(db_tx).await?;
        match brc20_pg::get_token(tick, db_tx).await? {
            Some(db_token) => {
                self.tokens.put(tick.to_string(), db_token.clone());
                Ok(Some(db_token))
            }
            None => Ok(None),
        }
    }

    pub async fn get_token_minted_supply(
        &mut self,
        tick: &str,
        db_tx: &Transaction<'_>,
    ) -> Result<Option<u128>, String> {
        if let Some(minted) = self.token_minted_supplies.get(&tick.to_string()) {
            return Ok(Some(*minted));
        }
        self.handle_cache_miss(db_tx).await?;
        if let Some(minted_supply) = brc20_pg::get_token_minted_supply(tick, db_tx).await? {
            self.token_minted_supplies.put(tick.to_string(), minted_supply);
            return Ok(Some(minted_supply));
        }
        Ok(None)
    }

    pub async fn get_token_address_avail_balance(
        &mut self,
        tick: &str,
        address: &str,
        db_tx: &Transaction<'_>,
    ) -> Result<Option<u128>, String> {
        let key = format!("{}:{}", tick, address);
        if let Some(balance) = self.token_addr_avail_balances.get(&key) {
            return Ok(Some(*balance));
        }
        self.handle_cache_miss(db_tx).await?;
        if let Some(balance) =
            brc20_pg::get_token_available_balance_for_address(tick, address, db_tx).await?
        {
            self.token_addr_avail_balances.put(key, balance);
            return Ok(Some(balance));
        }
        Ok(None)
    }

    pub async fn get_unsent_token_transfer(
        &mut self,
        ordinal_number: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<Option<DbOperation>, String> {
        // Use `get` instead of `contains` so we promote this value in the LRU.
        if self.ignored_inscriptions.get(&ordinal_number).is_some() {
            return Ok(None);
        }
        if let Some(row) = self.unsent_transfers.get(&ordinal_number) {
            return Ok(Some(row.clone()));
        }
        self.handle_cache_miss(db_tx).await?;
        match brc20_pg::get_unsent_token_transfer(ordinal_number, db_tx).await? {
            Some(row) => {
                self.unsent_transfers.put(ordinal_number, row.clone());
                Ok(Some(row))
            }
            None => {
                // Inscription is not relevant for BRC-20.
                self.ignore_inscription(ordinal_number);
                Ok(None)
            }
        }
    }

    /// Marks an ordinal number as ignored so we don't bother computing its transfers for BRC-20
    /// purposes.
    pub fn ignore_inscription(&mut self, ordinal_number: u64) {
        self.ignored_inscriptions.put(ordinal_number, true);
    }

    pub fn insert_token_deploy(
        &mut self,
        data: &VerifiedBrc20TokenDeployData,
        reveal: &OrdinalInscriptionRevealData,
        block_identifier: &BlockIdentifier,
        timestamp: u32,
        tx_identifier: &TransactionIdentifier,
        tx_index: u64,
    ) -> Result<(), String> {
        let (output, offset) = parse_satpoint(&reveal.satpoint_post_inscription)?;
        let token = DbToken {
            ticker: data.tick.clone(),
            display_ticker: data.display_tick.clone(),
            inscription_id: reveal.inscription_id.clone(),
            inscription_number: reveal.inscription_number.jubilee,
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            address: data.address.clone(),
            max: PgNumericU128(data.max),
            limit: PgNumericU128(data.lim),
            decimals: PgSmallIntU8(data.dec),
            self_mint: data.self_mint,
            minted_supply: PgNumericU128(0),
            tx_count: 1,
            timestamp: PgBigIntU32(timestamp),
        };
        self.tokens.put(token.ticker.clone(), token.clone());
        self.token_minted_supplies.put(token.ticker.clone(), 0);
        self.token_addr_avail_balances
            .put(format!("{}:{}", token.ticker, data.address), 0);
        self.db_cache.token_rows.push(token);
        self.db_cache.operation_rows.push(DbOperation {
            ticker: data.tick.clone(),
            operation: "deploy".to_string(),
            inscription_id: reveal.inscription_id.clone(),
            inscription_number: reveal.inscription_number.jubilee,
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            output,
            offset: offset.map(PgNumericU64),
            timestamp: PgBigIntU32(timestamp),
            address: data.address.clone(),
            to_address: None,
            amount: PgNumericU128(0),
        });
        self.ignore_inscription(reveal.ordinal_number);
        Ok(())
    }

    pub async fn insert_token_mint(
        &mut self,
        data: &VerifiedBrc20BalanceData,
        reveal: &OrdinalInscriptionRevealData,
        block_identifier: &BlockIdentifier,
        timestamp: u32,
        tx_identifier: &TransactionIdentifier,
        tx_index: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<(), String> {
        let Some(minted) = self.get_token_minted_supply(&data.tick, db_tx).await? else {
            unreachable!("BRC-20 deployed token should have a minted supply entry");
        };
        self.token_minted_supplies
            .put(data.tick.clone(), minted + data.amt);
        let balance = self
            .get_token_address_avail_balance(&data.tick, &data.address, db_tx)
            .await?
            .unwrap_or(0);
        self.token_addr_avail_balances.put(
            format!("{}:{}", data.tick, data.address),
            balance + data.amt, // Increase for minter.
        );
        let (output, offset) = parse_satpoint(&reveal.satpoint_post_inscription)?;
        self.db_cache.operation_rows.push(DbOperation {
            ticker: data.tick.clone(),
            operation: "mint".to_string(),
            inscription_id: reveal.inscription_id.clone(),
            inscription_number: reveal.inscription_number.jubilee,
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            output,
            offset: offset.map(PgNumericU64),
            timestamp: PgBigIntU32(timestamp),
            address: data.address.clone(),
            to_address: None,
            amount: PgNumericU128(data.amt),
        });
        self.db_cache
            .push_balance_delta(&data.tick, &data.address, data.amt as i128, 0);
        *self
            .db_cache
            .minted_supply_deltas
            .entry(data.tick.clone())
            .or_insert(0) += data.amt;
        *self
            .db_cache
            .tx_count_deltas
            .entry(data.tick.clone())
            .or_insert(0) += 1;
        self.touched_balance_pairs
            .insert((data.tick.clone(), data.address.clone()));
        self.ignore_inscription(reveal.ordinal_number);
        Ok(())
    }

    pub async fn insert_token_transfer(
        &mut self,
        data: &VerifiedBrc20BalanceData,
        reveal: &OrdinalInscriptionRevealData,
        block_identifier: &BlockIdentifier,
        timestamp: u32,
        tx_identifier: &TransactionIdentifier,
        tx_index: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<(), String> {
        let Some(balance) = self
            .get_token_address_avail_balance(&data.tick, &data.address, db_tx)
            .await?
        else {
            unreachable!("BRC-20 transfer insert attempted for an address with no balance");
        };
        self.token_addr_avail_balances.put(
            format!("{}:{}", data.tick, data.address),
            balance - data.amt, // Decrease for sender.
        );
        let (output, offset) = parse_satpoint(&reveal.satpoint_post_inscription)?;
        let operation_row = DbOperation {
            ticker: data.tick.clone(),
            operation: "transfer".to_string(),
            inscription_id: reveal.inscription_id.clone(),
            inscription_number: reveal.inscription_number.jubilee,
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            output,
            offset: offset.map(PgNumericU64),
            timestamp: PgBigIntU32(timestamp),
            address: data.address.clone(),
            to_address: None,
            amount: PgNumericU128(data.amt),
        };
        self.unsent_transfers
            .put(reveal.ordinal_number, operation_row.clone());
        self.db_cache.operation_rows.push(operation_row);
        self.db_cache.push_balance_delta(
            &data.tick,
            &data.address,
            -(data.amt as i128),
            data.amt as i128,
        );
        *self
            .db_cache
            .tx_count_deltas
            .entry(data.tick.clone())
            .or_insert(0) += 1;
        self.touched_balance_pairs
            .insert((data.tick.clone(), data.address.clone()));
        self.ignored_inscriptions.pop(&reveal.ordinal_number); // Just in case.
        Ok(())
    }

    pub async fn insert_token_transfer_send(
        &mut self,
        data: &VerifiedBrc20TransferData,
        transfer: &OrdinalInscriptionTransferData,
        block_identifier: &BlockIdentifier,
        timestamp: u32,
        tx_identifier: &TransactionIdentifier,
        tx_index: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<(), String> {
        let transfer_row = self
            .get_unsent_transfer_row(transfer.ordinal_number, db_tx)
            .await?;
        // Read the receiver's balance before queueing the deltas; a cache-miss flush after the
        // push would already include the credit.
        let receiver_balance = self
            .get_token_address_avail_balance(&data.tick, &data.receiver_address, db_tx)
            .await?
            .unwrap_or(0);
        let (output, offset) = parse_satpoint(&transfer.satpoint_post_transfer)?;
        self.db_cache.operation_rows.push(DbOperation {
            ticker: data.tick.clone(),
            operation: "transfer_send".to_string(),
            inscription_id: transfer_row.inscription_id.clone(),
            inscription_number: transfer_row.inscription_number,
            ordinal_number: PgNumericU64(transfer.ordinal_number),
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            output: output.clone(),
            offset: offset.map(PgNumericU64),
            timestamp: PgBigIntU32(timestamp),
            address: data.sender_address.clone(),
            to_address: Some(data.receiver_address.clone()),
            amount: PgNumericU128(data.amt),
        });
        self.db_cache.operation_rows.push(DbOperation {
            ticker: data.tick.clone(),
            operation: "transfer_receive".to_string(),
            inscription_id: transfer_row.inscription_id.clone(),
            inscription_number: transfer_row.inscription_number,
            ordinal_number: PgNumericU64(transfer.ordinal_number),
            block_height: PgNumericU64(block_identifier.index),
            block_hash: block_identifier.hash.clone(),
            tx_id: tx_identifier.hash.clone(),
            tx_index: PgBigIntU32(tx_index as u32),
            output,
            offset: offset.map(PgNumericU64),
            timestamp: PgBigIntU32(timestamp),
            address: data.receiver_address.clone(),
            to_address: None,
            amount: PgNumericU128(data.amt),
        });
        self.db_cache.push_balance_delta(
            &data.tick,
            &data.sender_address,
            0,
            -(data.amt as i128),
        );
        self.db_cache
            .push_balance_delta(&data.tick, &data.receiver_address, data.amt as i128, 0);
        *self
            .db_cache
            .tx_count_deltas
            .entry(data.tick.clone())
            .or_insert(0) += 1;
        self.touched_balance_pairs
            .insert((data.tick.clone(), data.sender_address.clone()));
        self.touched_balance_pairs
            .insert((data.tick.clone(), data.receiver_address.clone()));
        self.token_addr_avail_balances.put(
            format!("{}:{}", data.tick, data.receiver_address),
            receiver_balance + data.amt, // Increase for receiver.
        );
        // We're not interested in further transfers of this inscription.
        self.unsent_transfers.pop(&transfer.ordinal_number);
        self.ignore_inscription(transfer.ordinal_number);
        Ok(())
    }

    /// Writes one balances history snapshot per (ticker, address) the block touched, taken after
    /// all of the block's operations.
    pub async fn flush_block_balances_history(
        &mut self,
        block_height: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<(), String> {
        self.db_cache.flush(db_tx).await?;
        let pairs: Vec<(String, String)> = self.touched_balance_pairs.drain().collect();
        brc20_pg::insert_balance_history_snapshots(&pairs, block_height, db_tx).await?;
        Ok(())
    }

    //
    //
    //

    async fn get_unsent_transfer_row(
        &mut self,
        ordinal_number: u64,
        db_tx: &Transaction<'_>,
    ) -> Result<DbOperation, String> {
        if let Some(transfer) = self.unsent_transfers.get(&ordinal_number) {
            return Ok(transfer.clone());
        }
        self.handle_cache_miss(db_tx).await?;
        let Some(transfer) = brc20_pg::get_unsent_token_transfer(ordinal_number, db_tx).await?
        else {
            return Err(format!(
                "invalid transfer ordinal number {ordinal_number}"
            ));
        };
        self.unsent_transfers.put(ordinal_number, transfer.clone());
        Ok(transfer)
    }

    async fn handle_cache_miss(&mut self, db_tx: &Transaction<'_>) -> Result<(), String> {
        self.db_cache.flush(db_tx).await?;
        Ok(())
    }
}
