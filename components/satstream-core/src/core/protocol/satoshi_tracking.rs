use std::collections::HashMap;

use satstream_postgres::deadpool_postgres::Transaction;
use satstream_types::{
    BitcoinBlockData, OrdinalInscriptionTransferData, OrdinalInscriptionTransferDestination,
};

use crate::db::models::{DbCurrentLocation, DbInscriptionTransfer, DbLocation};
use crate::db::ordinals_pg;
use crate::try_info;
use crate::utils::Context;

pub const UNBOUND_OUTPOINT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000:0";

/// Splits a `<txid>:<vout>[:<offset>]` satpoint into its outpoint and optional offset.
pub fn parse_satpoint(satpoint: &str) -> Result<(String, Option<u64>), String> {
    let parts: Vec<&str> = satpoint.split(':').collect();
    let tx_id = parts.get(0).ok_or("parse_satpoint: tx_id not found")?;
    let output = parts.get(1).ok_or("parse_satpoint: output not found")?;
    let offset: Option<u64> = match parts.get(2) {
        Some(part) => Some(
            part.parse::<u64>()
                .map_err(|e| format!("parse_satpoint: {e}"))?,
        ),
        None => None,
    };
    Ok((format!("{}:{}", tx_id, output), offset))
}

pub fn transfer_type_for_destination(
    destination: &OrdinalInscriptionTransferDestination,
) -> &'static str {
    match destination {
        OrdinalInscriptionTransferDestination::Transferred(_) => "transferred",
        OrdinalInscriptionTransferDestination::SpentInFees => "spent_in_fees",
        OrdinalInscriptionTransferDestination::Burnt(_) => "burnt",
    }
}

/// Applies one inscription-transfer event: appends the new location, overwrites the sat's current
/// location, and logs one `inscription_transfers` row per inscription riding on the sat.
/// Transfers of one block must be applied in ascending `(tx_index)` order so that chained moves of
/// the same sat resolve their previous location correctly.
pub async fn apply_transfer(
    transfer: &OrdinalInscriptionTransferData,
    block: &BitcoinBlockData,
    tx_id: &str,
    block_transfer_index: &mut i32,
    db_tx: &Transaction<'_>,
    ctx: &Context,
) -> Result<(), String> {
    let Some(previous) = ordinals_pg::get_current_location(transfer.ordinal_number, db_tx).await?
    else {
        return Err(format!(
            "transfer for Satoshi {} without a known current location",
            transfer.ordinal_number
        ));
    };
    let location = DbLocation::from_transfer(transfer, block, tx_id)?;
    ordinals_pg::insert_locations(&vec![location.clone()], db_tx).await?;
    ordinals_pg::upsert_current_locations(
        &vec![DbCurrentLocation::from_location(&location)],
        db_tx,
    )
    .await?;

    let inscriptions = ordinals_pg::get_inscriptions_at_ordinal(transfer.ordinal_number, db_tx).await?;
    let mut transfer_rows = vec![];
    let mut incremented = HashMap::new();
    let mut decremented = HashMap::new();
    for (inscription_id, number) in inscriptions.into_iter() {
        transfer_rows.push(DbInscriptionTransfer {
            inscription_id,
            number,
            ordinal_number: location.ordinal_number,
            block_height: location.block_height,
            tx_index: location.tx_index,
            block_hash: location.block_hash.clone(),
            from_block_height: previous.block_height,
            from_tx_index: previous.tx_index,
            block_transfer_index: *block_transfer_index,
        });
        *block_transfer_index += 1;
        if let Some(address) = &location.address {
            *incremented.entry(address.clone()).or_insert(0) += 1;
        }
        if let Some(address) = &previous.address {
            *decremented.entry(address.clone()).or_insert(0) += 1;
        }
    }
    ordinals_pg::insert_inscription_transfers(&transfer_rows, db_tx).await?;
    ordinals_pg::update_counts_by_address(&incremented, true, db_tx).await?;
    ordinals_pg::update_counts_by_address(&decremented, false, db_tx).await?;

    try_info!(
        ctx,
        "Inscription transfer detected on Satoshi {} ({} -> {}) at block #{}",
        transfer.ordinal_number,
        transfer.satpoint_pre_transfer,
        transfer.satpoint_post_transfer,
        block.block_identifier.index
    );
    Ok(())
}

/// Reverses every transfer of a block: gives the address counters back, drops the transfer log
/// and location rows, and restores each touched sat's current location to the latest remaining
/// `locations` row.
pub async fn rollback_block_transfers(
    block_height: u64,
    db_tx: &Transaction<'_>,
    _ctx: &Context,
) -> Result<Vec<u64>, String> {
    let transfers = ordinals_pg::get_transfers_at_block(block_height, db_tx).await?;
    let mut incremented = HashMap::new();
    let mut decremented = HashMap::new();
    for transfer in transfers.iter() {
        let to_location = ordinals_pg::get_location(
            transfer.ordinal_number.0,
            transfer.block_height.0,
            transfer.tx_index.0,
            db_tx,
        )
        .await?;
        let from_location = ordinals_pg::get_location(
            transfer.ordinal_number.0,
            transfer.from_block_height.0,
            transfer.from_tx_index.0,
            db_tx,
        )
        .await?;
        if let Some(address) = to_location.and_then(|l| l.address) {
            *decremented.entry(address).or_insert(0) += 1;
        }
        if let Some(address) = from_location.and_then(|l| l.address) {
            *incremented.entry(address).or_insert(0) += 1;
        }
    }
    ordinals_pg::update_counts_by_address(&incremented, true, db_tx).await?;
    ordinals_pg::update_counts_by_address(&decremented, false, db_tx).await?;
    ordinals_pg::delete_inscription_transfers_at_block(block_height, db_tx).await?;

    let mut affected_sats = ordinals_pg::delete_locations_at_block(block_height, db_tx).await?;
    affected_sats.sort_unstable();
    affected_sats.dedup();
    for ordinal_number in affected_sats.iter() {
        match ordinals_pg::get_latest_location_of_sat(*ordinal_number, db_tx).await? {
            Some(location) => {
                ordinals_pg::upsert_current_locations(
                    &vec![DbCurrentLocation::from_location(&location)],
                    db_tx,
                )
                .await?
            }
            None => ordinals_pg::delete_current_location(*ordinal_number, db_tx).await?,
        };
    }
    Ok(affected_sats)
}

#[cfg(test)]
mod test {
    use satstream_types::OrdinalInscriptionTransferDestination;
    use test_case::test_case;

    use super::{parse_satpoint, transfer_type_for_destination};

    #[test]
    fn parses_satpoints() {
        let (output, offset) = parse_satpoint(
            "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:2:5000",
        )
        .unwrap();
        assert_eq!(
            output,
            "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:2"
        );
        assert_eq!(offset, Some(5000));

        let (output, offset) = parse_satpoint(
            "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:0",
        )
        .unwrap();
        assert_eq!(
            output,
            "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:0"
        );
        assert_eq!(offset, None);

        assert!(parse_satpoint("deadbeef:0:not-a-number").is_err());
    }

    #[test_case(OrdinalInscriptionTransferDestination::Transferred("bc1q".into()) => "transferred")]
    #[test_case(OrdinalInscriptionTransferDestination::SpentInFees => "spent_in_fees")]
    #[test_case(OrdinalInscriptionTransferDestination::Burnt("OP_RETURN".into()) => "burnt")]
    fn maps_destination_to_transfer_type(
        destination: OrdinalInscriptionTransferDestination,
    ) -> &'static str {
        transfer_type_for_destination(&destination)
    }
}
