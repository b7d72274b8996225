use rocket::serde::json::Value as JsonValue;
use satstream::core::meta_protocols::brc20::models::DbToken;
use satstream::core::meta_protocols::brc20::u128_amount_to_decimals_str;
use satstream::db::models::DbLocation;
use satstream::ord::charm::Charm;
use satstream::ord::sat::Sat;
use satstream::satstream_postgres::tokio_postgres::Row;
use satstream::satstream_postgres::types::{PgBigIntU32, PgNumericU128, PgNumericU64, PgSmallIntU8};

#[derive(Serialize)]
pub struct PaginatedResponse<T: serde::Serialize> {
    pub limit: usize,
    pub offset: usize,
    pub total: u64,
    pub results: Vec<T>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub server_version: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_inscription_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cursed_inscription_number: Option<i64>,
}

#[derive(Serialize)]
pub struct InscriptionResponse {
    pub id: String,
    pub number: i64,
    pub classic_number: i64,
    pub address: Option<String>,
    pub genesis_address: Option<String>,
    pub genesis_block_height: u64,
    pub genesis_block_hash: String,
    pub genesis_tx_id: String,
    pub genesis_fee: String,
    pub genesis_timestamp: u32,
    pub tx_id: String,
    pub location: String,
    pub output: String,
    pub offset: Option<String>,
    pub value: Option<String>,
    pub sat_ordinal: String,
    pub sat_rarity: String,
    pub sat_coinbase_height: u64,
    pub mime_type: String,
    pub content_type: String,
    pub content_length: u32,
    pub timestamp: u32,
    pub curse_type: Option<String>,
    pub recursive: bool,
    pub recursion_refs: Vec<String>,
    pub parent_refs: Vec<String>,
    pub delegate: Option<String>,
    pub metadata: Option<JsonValue>,
    pub metaprotocol: Option<String>,
    pub charms: Vec<&'static str>,
}

impl InscriptionResponse {
    pub fn from_pg_row(row: &Row) -> Self {
        let output: String = row.get("output");
        let offset: Option<PgNumericU64> = row.get("offset");
        let genesis_timestamp: PgBigIntU32 = row.get("genesis_timestamp");
        let timestamp: Option<PgBigIntU32> = row.get("timestamp");
        let metadata: Option<String> = row.get("metadata");
        let charms: i32 = row.get("charms");
        let location_offset = offset.map(|o| o.0).unwrap_or(0);
        InscriptionResponse {
            id: row.get("inscription_id"),
            number: row.get("number"),
            classic_number: row.get("classic_number"),
            address: row.get("address"),
            genesis_address: row.get("genesis_address"),
            genesis_block_height: row.get::<&str, PgNumericU64>("genesis_block_height").0,
            genesis_block_hash: row.get("genesis_block_hash"),
            genesis_tx_id: row.get("genesis_tx_id"),
            genesis_fee: row.get::<&str, PgNumericU64>("genesis_fee").to_string(),
            genesis_timestamp: genesis_timestamp.0,
            tx_id: row.get("tx_id"),
            location: format!("{}:{}", output, location_offset),
            output,
            offset: offset.map(|o| o.to_string()),
            value: row
                .get::<&str, Option<PgNumericU64>>("value")
                .map(|v| v.to_string()),
            sat_ordinal: row.get::<&str, PgNumericU64>("ordinal_number").to_string(),
            sat_rarity: row.get("sat_rarity"),
            sat_coinbase_height: row.get::<&str, PgNumericU64>("sat_coinbase_height").0,
            mime_type: row.get("mime_type"),
            content_type: row.get("content_type"),
            content_length: row.get::<&str, PgBigIntU32>("content_length").0,
            timestamp: timestamp.map(|t| t.0).unwrap_or(genesis_timestamp.0),
            curse_type: row.get("curse_type"),
            recursive: row.get("recursive"),
            recursion_refs: row.get("recursion_refs"),
            parent_refs: row.get("parent_refs"),
            delegate: row.get("delegate"),
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            metaprotocol: row.get("metaprotocol"),
            charms: Charm::titles(charms as u16),
        }
    }
}

#[derive(Serialize)]
pub struct LocationResponse {
    pub block_height: u64,
    pub block_hash: String,
    pub tx_id: String,
    pub address: Option<String>,
    pub output: String,
    pub offset: Option<String>,
    pub value: Option<String>,
    pub transfer_type: String,
    pub location: String,
    pub timestamp: u32,
}

impl LocationResponse {
    pub fn from_location(location: &DbLocation) -> Self {
        let location_offset = location.offset.map(|o| o.0).unwrap_or(0);
        LocationResponse {
            block_height: location.block_height.0,
            block_hash: location.block_hash.clone(),
            tx_id: location.tx_id.clone(),
            address: location.address.clone(),
            output: location.output.clone(),
            offset: location.offset.map(|o| o.to_string()),
            value: location.value.map(|v| v.to_string()),
            transfer_type: location.transfer_type.clone(),
            location: format!("{}:{}", location.output, location_offset),
            timestamp: location.timestamp.0,
        }
    }
}

#[derive(Serialize)]
pub struct InscriptionTransferPerBlockResponse {
    pub id: String,
    pub number: i64,
    pub from: LocationResponse,
    pub to: LocationResponse,
}

#[derive(Serialize)]
pub struct SatResponse {
    pub ordinal: u64,
    pub rarity: String,
    pub coinbase_height: u64,
    pub cycle: u64,
    pub epoch: u64,
    pub period: u64,
    pub offset: u64,
    pub decimal: String,
    pub degree: String,
    pub percentile: String,
    pub name: String,
}

impl SatResponse {
    pub fn from_sat(sat: Sat) -> Self {
        SatResponse {
            ordinal: sat.n(),
            rarity: sat.rarity().to_string(),
            coinbase_height: sat.height(),
            cycle: sat.cycle(),
            epoch: sat.epoch(),
            period: sat.period(),
            offset: sat.third(),
            decimal: sat.decimal(),
            degree: sat.degree(),
            percentile: sat.percentile(),
            name: sat.name(),
        }
    }
}

#[derive(Serialize)]
pub struct StatsBlockResponse {
    pub block_height: u64,
    pub block_hash: String,
    pub inscription_count: i32,
    pub inscription_count_accum: i32,
    pub timestamp: u32,
}

impl StatsBlockResponse {
    pub fn from_pg_row(row: &Row) -> Self {
        StatsBlockResponse {
            block_height: row.get::<&str, PgNumericU64>("block_height").0,
            block_hash: row.get("block_hash"),
            inscription_count: row.get("inscription_count"),
            inscription_count_accum: row.get("inscription_count_accum"),
            timestamp: row.get::<&str, PgBigIntU32>("timestamp").0,
        }
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub ticker: String,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub block_height: u64,
    pub tx_id: String,
    pub address: String,
    pub max_supply: String,
    pub mint_limit: String,
    pub decimals: u8,
    pub self_mint: bool,
    pub minted_supply: String,
    pub tx_count: i64,
    pub deploy_timestamp: u32,
}

impl TokenResponse {
    pub fn from_token(token: &DbToken) -> Self {
        TokenResponse {
            ticker: token.display_ticker.clone(),
            inscription_id: token.inscription_id.clone(),
            inscription_number: token.inscription_number,
            block_height: token.block_height.0,
            tx_id: token.tx_id.clone(),
            address: token.address.clone(),
            max_supply: u128_amount_to_decimals_str(token.max.0, token.decimals.0),
            mint_limit: u128_amount_to_decimals_str(token.limit.0, token.decimals.0),
            decimals: token.decimals.0,
            self_mint: token.self_mint,
            minted_supply: u128_amount_to_decimals_str(token.minted_supply.0, token.decimals.0),
            tx_count: token.tx_count,
            deploy_timestamp: token.timestamp.0,
        }
    }
}

#[derive(Serialize)]
pub struct TokenSupplyResponse {
    pub max_supply: String,
    pub minted_supply: String,
    pub holders: i64,
}

#[derive(Serialize)]
pub struct TokenDetailsResponse {
    pub token: TokenResponse,
    pub supply: TokenSupplyResponse,
}

#[derive(Serialize)]
pub struct HolderResponse {
    pub address: String,
    pub overall_balance: String,
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub operation: String,
    pub ticker: String,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub ordinal_number: String,
    pub block_height: u64,
    pub block_hash: String,
    pub tx_id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub timestamp: u32,
    pub amount: String,
}

impl ActivityResponse {
    /// Expects an `operations` row joined with its token for `decimals` and `display_ticker`.
    pub fn from_pg_row(row: &Row) -> Self {
        let decimals: PgSmallIntU8 = row.get("decimals");
        let amount: PgNumericU128 = row.get("amount");
        ActivityResponse {
            operation: row.get("operation"),
            ticker: row.get("display_ticker"),
            inscription_id: row.get("inscription_id"),
            inscription_number: row.get("inscription_number"),
            ordinal_number: row.get::<&str, PgNumericU64>("ordinal_number").to_string(),
            block_height: row.get::<&str, PgNumericU64>("block_height").0,
            block_hash: row.get("block_hash"),
            tx_id: row.get("tx_id"),
            address: row.get("address"),
            to_address: row.get("to_address"),
            timestamp: row.get::<&str, PgBigIntU32>("timestamp").0,
            amount: u128_amount_to_decimals_str(amount.0, decimals.0),
        }
    }
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub ticker: String,
    pub avail_balance: String,
    pub trans_balance: String,
    pub total_balance: String,
}

impl BalanceResponse {
    /// Expects a balance row joined with its token for `decimals` and `display_ticker`.
    pub fn from_pg_row(row: &Row) -> Self {
        let decimals: PgSmallIntU8 = row.get("decimals");
        let avail: PgNumericU128 = row.get("avail_balance");
        let trans: PgNumericU128 = row.get("trans_balance");
        let total: PgNumericU128 = row.get("total_balance");
        BalanceResponse {
            ticker: row.get("display_ticker"),
            avail_balance: u128_amount_to_decimals_str(avail.0, decimals.0),
            trans_balance: u128_amount_to_decimals_str(trans.0, decimals.0),
            total_balance: u128_amount_to_decimals_str(total.0, decimals.0),
        }
    }
}
