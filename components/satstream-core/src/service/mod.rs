pub mod chain_tip;

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use config::Config;
use crossbeam_channel::Receiver;
use satstream_postgres::deadpool_postgres::Pool;
use satstream_postgres::{pg_begin, pg_pool, pg_pool_client};
use satstream_types::{BitcoinBlockData, BlockEvent};

use crate::core::meta_protocols::brc20::brc20_pg;
use crate::core::meta_protocols::brc20::cache::Brc20MemoryCache;
use crate::core::meta_protocols::brc20::index::{
    index_block_and_insert_brc20_operations, rollback_block_brc20_operations,
};
use crate::core::meta_protocols::brc20::brc20_new_cache;
use crate::core::protocol::inscription_indexing::{index_block_ordinals, rollback_block_ordinals};
use crate::db::ordinals_pg;
use crate::utils::{exit_codes, Context};
use crate::{try_error, try_info, try_warn};

use self::chain_tip::ChainTip;

const MAX_BLOCK_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub struct PgConnectionPools {
    pub ordinals: Pool,
    pub brc20: Option<Pool>,
}

/// Terminal failure of the ingest loop, mapped to the writer's exit codes.
#[derive(Debug)]
pub enum ServiceError {
    InvariantViolation(String),
    Io(String),
}

impl ServiceError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::InvariantViolation(_) => exit_codes::INVARIANT_VIOLATION,
            ServiceError::Io(_) => exit_codes::IO_FAILURE,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::InvariantViolation(e) => write!(f, "invariant violation: {e}"),
            ServiceError::Io(e) => write!(f, "io failure: {e}"),
        }
    }
}

/// Errors that prove the index and the event stream disagree about state. Retrying cannot fix
/// them; the process must stop before more damage is written.
fn is_invariant_violation(e: &str) -> bool {
    e.contains("violates check constraint")
        || e.contains("duplicate key value")
        || e.contains("debit for unknown balance")
}

pub struct Service {
    pub config: Config,
    pub ctx: Context,
    pub pg_pools: PgConnectionPools,
    chain_tip: ChainTip,
    brc20_cache: Option<Brc20MemoryCache>,
}

impl Service {
    pub fn new(config: &Config, ctx: &Context) -> Result<Self, String> {
        let Some(ordinals) = &config.ordinals else {
            return Err("Config entry for `ordinals` not found".to_string());
        };
        Ok(Service {
            config: config.clone(),
            ctx: ctx.clone(),
            pg_pools: PgConnectionPools {
                ordinals: pg_pool(&ordinals.db)?,
                brc20: match config.ordinals_brc20_config() {
                    Some(brc20) => Some(pg_pool(&brc20.db)?),
                    None => None,
                },
            },
            chain_tip: ChainTip::new(),
            brc20_cache: brc20_new_cache(config),
        })
    }

    /// Handle to the process-wide chain tip cache, published after every commit.
    pub fn chain_tip(&self) -> ChainTip {
        self.chain_tip.clone()
    }

    /// Reads the last applied block from the index and publishes it to the in-memory cache.
    pub async fn get_index_chain_tip(&self) -> Result<Option<(u64, String)>, String> {
        let mut ord_client = pg_pool_client(&self.pg_pools.ordinals).await?;
        let ord_tx = pg_begin(&mut ord_client).await?;
        let tip = ordinals_pg::get_chain_tip(&ord_tx).await?;
        ord_tx
            .commit()
            .await
            .map_err(|e| format!("unable to commit get_index_chain_tip transaction: {e}"))?;
        self.chain_tip.set(tip.clone());
        Ok(tip)
    }

    /// Consumes the block event stream until it closes. Applies extend the index, rollbacks
    /// shrink it; the ingest task never interleaves two blocks, so a shutdown (stream close)
    /// only ever lands on a block boundary.
    pub async fn run(&mut self, events: Receiver<BlockEvent>) -> Result<(), ServiceError> {
        let tip = self
            .get_index_chain_tip()
            .await
            .map_err(ServiceError::Io)?;
        match &tip {
            Some((height, _)) => try_info!(self.ctx, "Index chain tip is at #{height}"),
            None => try_info!(self.ctx, "Index is empty, waiting for the first block"),
        };

        loop {
            let event = match events.recv() {
                Ok(event) => event,
                Err(_) => {
                    try_info!(self.ctx, "Event stream closed, shutting down");
                    break;
                }
            };
            let result = match &event {
                BlockEvent::Apply(block) => self.apply_block_with_retries(block).await,
                BlockEvent::Rollback(block_id) => self.rollback_block(block_id.index).await,
            };
            if let Err(e) = result {
                try_error!(self.ctx, "{e}");
                if is_invariant_violation(&e) {
                    return Err(ServiceError::InvariantViolation(e));
                }
                return Err(ServiceError::Io(e));
            }
        }
        Ok(())
    }

    /// Rolls back index data for the specified block heights, highest first.
    pub async fn rollback(&mut self, block_heights: &Vec<u64>) -> Result<(), String> {
        self.get_index_chain_tip().await?;
        let mut heights = block_heights.clone();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        for block_height in heights.iter() {
            self.rollback_block(*block_height).await?;
        }
        Ok(())
    }

    async fn apply_block_with_retries(&mut self, block: &BitcoinBlockData) -> Result<(), String> {
        let mut attempt: u32 = 0;
        loop {
            match self.apply_block(block).await {
                Ok(()) => return Ok(()),
                Err(e) if is_invariant_violation(&e) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > MAX_BLOCK_RETRIES {
                        return Err(e);
                    }
                    // The memory cache may hold mutations from the failed attempt; the retry
                    // must re-read committed state.
                    self.brc20_cache = brc20_new_cache(&self.config);
                    try_warn!(
                        self.ctx,
                        "Error applying block #{}, retrying ({attempt}/{MAX_BLOCK_RETRIES}): {e}",
                        block.block_identifier.index
                    );
                    tokio::time::sleep(Duration::from_millis(500u64 << attempt)).await;
                }
            };
        }
    }

    /// Applies one block. The block is only accepted on top of the current tip; stale tip blocks
    /// are first rolled back until the incoming block's parent aligns. All ordinal effects and
    /// all BRC-20 effects commit in two coupled transactions: brc20 only commits after ordinals
    /// did, and an ordinals commit without its brc20 half is compensated away.
    async fn apply_block(&mut self, block: &BitcoinBlockData) -> Result<(), String> {
        loop {
            match self.chain_tip.get() {
                None => break,
                Some((tip_height, tip_hash)) => {
                    if block.parent_block_identifier.hash == tip_hash {
                        break;
                    }
                    if tip_height >= block.block_identifier.index {
                        try_info!(
                            self.ctx,
                            "Block #{} does not extend tip #{tip_height}, rolling back",
                            block.block_identifier.index
                        );
                        self.rollback_block(tip_height).await?;
                        continue;
                    }
                    return Err(format!(
                        "out-of-order block #{} (tip is #{tip_height}, parent hash mismatch)",
                        block.block_identifier.index
                    ));
                }
            };
        }

        let block_height = block.block_identifier.index;
        let mut ord_client = pg_pool_client(&self.pg_pools.ordinals).await?;
        let ord_tx = pg_begin(&mut ord_client).await?;
        index_block_ordinals(block, &ord_tx, &self.ctx).await?;
        ordinals_pg::update_chain_tip(
            Some((block_height, &block.block_identifier.hash)),
            &ord_tx,
        )
        .await?;

        let brc20_config = self.config.ordinals_brc20_config().cloned();
        match (self.pg_pools.brc20.clone(), brc20_config) {
            (Some(brc20_pool), Some(brc20_config)) => {
                let mut brc20_client = pg_pool_client(&brc20_pool).await?;
                let brc20_tx = pg_begin(&mut brc20_client).await?;
                // Skip blocks the brc20 store already has; a crash between the two commits below
                // leaves it one block behind and this apply is its catch-up.
                let brc20_tip = brc20_pg::get_chain_tip(&brc20_tx).await?;
                if brc20_tip.map_or(true, |tip| tip < block_height) {
                    if let Some(brc20_cache) = self.brc20_cache.as_mut() {
                        index_block_and_insert_brc20_operations(
                            block,
                            &brc20_config,
                            brc20_cache,
                            &brc20_tx,
                            &self.ctx,
                        )
                        .await?;
                    }
                    brc20_pg::update_chain_tip(Some(block_height), &brc20_tx).await?;
                }
                ord_tx
                    .commit()
                    .await
                    .map_err(|e| format!("unable to commit ordinals block: {e}"))?;
                if let Err(e) = brc20_tx.commit().await {
                    // Both stores must stay at the prior tip: take the ordinals block back out.
                    // The memory cache already absorbed the block's mutations and now disagrees
                    // with the brc20 store; drop it with the block.
                    self.brc20_cache = brc20_new_cache(&self.config);
                    self.compensate_ordinals_block(block_height).await?;
                    return Err(format!("unable to commit brc20 block: {e}"));
                }
            }
            _ => {
                ord_tx
                    .commit()
                    .await
                    .map_err(|e| format!("unable to commit ordinals block: {e}"))?;
            }
        };

        self.chain_tip
            .set(Some((block_height, block.block_identifier.hash.clone())));
        try_info!(self.ctx, "Block #{block_height} applied");
        Ok(())
    }

    /// Rolls back the tip block. A rollback for a block the index never applied is ignored.
    /// Stores commit in the reverse order of apply: brc20 first, so that a failure in between
    /// leaves a state the next retry recognizes and repairs.
    pub async fn rollback_block(&mut self, block_height: u64) -> Result<(), String> {
        match self.chain_tip.get() {
            None => {
                try_warn!(
                    self.ctx,
                    "Ignoring rollback of block #{block_height}, index is empty"
                );
                return Ok(());
            }
            Some((tip_height, _)) => {
                if block_height > tip_height {
                    try_warn!(
                        self.ctx,
                        "Ignoring rollback of block #{block_height}, it was never applied (tip is #{tip_height})"
                    );
                    return Ok(());
                }
                if block_height < tip_height {
                    return Err(format!(
                        "rollback of block #{block_height} below tip #{tip_height}, rollbacks must come in descending order"
                    ));
                }
            }
        };

        if let Some(brc20_pool) = self.pg_pools.brc20.clone() {
            let mut brc20_client = pg_pool_client(&brc20_pool).await?;
            let brc20_tx = pg_begin(&mut brc20_client).await?;
            if brc20_pg::get_chain_tip(&brc20_tx).await? == Some(block_height) {
                rollback_block_brc20_operations(block_height, &brc20_tx, &self.ctx).await?;
                brc20_pg::update_chain_tip(block_height.checked_sub(1), &brc20_tx).await?;
                brc20_tx
                    .commit()
                    .await
                    .map_err(|e| format!("unable to commit brc20 rollback: {e}"))?;
            }
            // The memory cache is populated from the state that just got rolled back.
            self.brc20_cache = brc20_new_cache(&self.config);
        }

        let new_tip = self.rollback_ordinals_block(block_height).await?;
        self.chain_tip.set(new_tip);
        Ok(())
    }

    /// Removes a committed ordinals block again after its brc20 half failed to commit.
    async fn compensate_ordinals_block(&self, block_height: u64) -> Result<(), String> {
        try_warn!(
            self.ctx,
            "Compensating ordinals block #{block_height}, brc20 commit failed"
        );
        let new_tip = self.rollback_ordinals_block(block_height).await?;
        self.chain_tip.set(new_tip);
        Ok(())
    }

    async fn rollback_ordinals_block(
        &self,
        block_height: u64,
    ) -> Result<Option<(u64, String)>, String> {
        let mut ord_client = pg_pool_client(&self.pg_pools.ordinals).await?;
        let ord_tx = pg_begin(&mut ord_client).await?;
        rollback_block_ordinals(block_height, &ord_tx, &self.ctx).await?;
        let new_tip = match block_height.checked_sub(1) {
            Some(parent_height) => ordinals_pg::get_block_hash(parent_height, &ord_tx)
                .await?
                .map(|hash| (parent_height, hash)),
            None => None,
        };
        ordinals_pg::update_chain_tip(
            new_tip.as_ref().map(|(height, hash)| (*height, hash.as_str())),
            &ord_tx,
        )
        .await?;
        ord_tx
            .commit()
            .await
            .map_err(|e| format!("unable to commit ordinals rollback: {e}"))?;
        Ok(new_tip)
    }
}
