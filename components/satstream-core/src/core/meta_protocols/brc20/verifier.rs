use config::OrdinalsBrc20Config;
use satstream_postgres::deadpool_postgres::Transaction;
use satstream_types::{
    BlockIdentifier, OrdinalInscriptionRevealData, OrdinalInscriptionTransferData,
    OrdinalInscriptionTransferDestination, TransactionIdentifier,
};

use crate::try_debug;
use crate::utils::Context;

use super::cache::Brc20MemoryCache;
use super::parser::{amt_has_valid_decimals, ParsedBrc20Operation};
use super::{brc20_self_mint_activation_height, decimals_str_amount_to_u128};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBrc20TokenDeployData {
    pub tick: String,
    pub display_tick: String,
    pub max: u128,
    pub lim: u128,
    pub dec: u8,
    pub address: String,
    pub self_mint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBrc20BalanceData {
    pub tick: String,
    pub amt: u128,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBrc20TransferData {
    pub tick: String,
    pub amt: u128,
    pub sender_address: String,
    pub receiver_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedBrc20Operation {
    TokenDeploy(VerifiedBrc20TokenDeployData),
    TokenMint(VerifiedBrc20BalanceData),
    TokenTransfer(VerifiedBrc20BalanceData),
    TokenTransferSend(VerifiedBrc20TransferData),
}

/// Validates a parsed BRC-20 reveal against the ledger. Returns `Ok(None)` when the operation
/// breaks a protocol rule; that is normal protocol behavior, not an error, and nothing is
/// recorded for it.
pub async fn verify_brc20_operation(
    operation: &ParsedBrc20Operation,
    reveal: &OrdinalInscriptionRevealData,
    block_identifier: &BlockIdentifier,
    brc20_config: &OrdinalsBrc20Config,
    cache: &mut Brc20MemoryCache,
    db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<Option<VerifiedBrc20Operation>, String> {
    let Some(inscriber_address) = reveal.inscriber_address.clone() else {
        return Ok(None);
    };
    if reveal.inscription_number.classic < 0 {
        // Cursed inscriptions are inert for BRC-20.
        return Ok(None);
    }
    match operation {
        ParsedBrc20Operation::Deploy(data) => {
            if data.tick.as_bytes().len() == 5
                && block_identifier.index < brc20_self_mint_activation_height(brc20_config)
            {
                try_debug!(
                    ctx,
                    "BRC-20 deploy {} rejected, self-mint tickers not active yet",
                    data.tick
                );
                return Ok(None);
            }
            if cache.get_token(&data.tick, db_tx).await?.is_some() {
                try_debug!(ctx, "BRC-20 deploy {} rejected, token exists", data.tick);
                return Ok(None);
            }
            Ok(Some(VerifiedBrc20Operation::TokenDeploy(
                VerifiedBrc20TokenDeployData {
                    tick: data.tick.clone(),
                    display_tick: data.display_tick.clone(),
                    max: data.max,
                    lim: data.lim,
                    dec: data.dec,
                    address: inscriber_address,
                    self_mint: data.self_mint,
                },
            )))
        }
        ParsedBrc20Operation::Mint(data) => {
            let Some(token) = cache.get_token(&data.tick, db_tx).await? else {
                return Ok(None);
            };
            if token.self_mint && inscriber_address != token.address {
                try_debug!(
                    ctx,
                    "BRC-20 mint {} rejected, self-mint token can only be minted by its deployer",
                    token.ticker
                );
                return Ok(None);
            }
            if !amt_has_valid_decimals(&data.amt, token.decimals.0) {
                return Ok(None);
            }
            let amt = decimals_str_amount_to_u128(&data.amt, token.decimals.0)?;
            if amt == 0 || amt > token.limit.0 {
                return Ok(None);
            }
            let minted_supply = cache
                .get_token_minted_supply(&data.tick, db_tx)
                .await?
                .unwrap_or(0);
            // Clamp to the remaining supply; a clamp to zero rejects the mint.
            let remaining = token.max.0.saturating_sub(minted_supply);
            let effective_amt = amt.min(remaining);
            if effective_amt == 0 {
                try_debug!(
                    ctx,
                    "BRC-20 mint {} rejected, no supply available",
                    token.ticker
                );
                return Ok(None);
            }
            Ok(Some(VerifiedBrc20Operation::TokenMint(
                VerifiedBrc20BalanceData {
                    tick: token.ticker,
                    amt: effective_amt,
                    address: inscriber_address,
                },
            )))
        }
        ParsedBrc20Operation::Transfer(data) => {
            let Some(token) = cache.get_token(&data.tick, db_tx).await? else {
                return Ok(None);
            };
            if !amt_has_valid_decimals(&data.amt, token.decimals.0) {
                return Ok(None);
            }
            let amt = decimals_str_amount_to_u128(&data.amt, token.decimals.0)?;
            if amt == 0 {
                return Ok(None);
            }
            let avail_balance = cache
                .get_token_address_avail_balance(&token.ticker, &inscriber_address, db_tx)
                .await?
                .unwrap_or(0);
            if avail_balance < amt {
                try_debug!(
                    ctx,
                    "BRC-20 transfer {} rejected, insufficient balance for {}",
                    token.ticker,
                    inscriber_address
                );
                return Ok(None);
            }
            Ok(Some(VerifiedBrc20Operation::TokenTransfer(
                VerifiedBrc20BalanceData {
                    tick: token.ticker,
                    amt,
                    address: inscriber_address,
                },
            )))
        }
    }
}

/// Checks which of a block's pending ordinal transfers move an unsent BRC-20 transfer
/// inscription. A transfer inscription can be sent at most once; a second move of the same
/// inscription is no longer a BRC-20 event.
pub async fn verify_brc20_transfers<'a>(
    transfers: &Vec<(&'a TransactionIdentifier, &'a OrdinalInscriptionTransferData)>,
    cache: &mut Brc20MemoryCache,
    db_tx: &Transaction<'_>,
    _ctx: &Context,
) -> Result<
    Vec<(
        String,
        VerifiedBrc20TransferData,
        &'a OrdinalInscriptionTransferData,
        &'a TransactionIdentifier,
    )>,
    String,
> {
    let mut results = vec![];
    for (tx_identifier, transfer) in transfers.iter() {
        let Some(unsent) = cache
            .get_unsent_token_transfer(transfer.ordinal_number, db_tx)
            .await?
        else {
            continue;
        };
        let receiver_address = match &transfer.destination {
            OrdinalInscriptionTransferDestination::Transferred(address) => address.clone(),
            // Spent as fees: the amount returns to the sender.
            OrdinalInscriptionTransferDestination::SpentInFees => unsent.address.clone(),
            OrdinalInscriptionTransferDestination::Burnt(script) => script.clone(),
        };
        results.push((
            unsent.inscription_id.clone(),
            VerifiedBrc20TransferData {
                tick: unsent.ticker.clone(),
                amt: unsent.amount.0,
                sender_address: unsent.address.clone(),
                receiver_address,
            },
            *transfer,
            *tx_identifier,
        ));
    }
    Ok(results)
}
