use satstream::db::models::DbLocation;
use satstream::satstream_postgres::deadpool_postgres::GenericClient;
use satstream::satstream_postgres::tokio_postgres::types::ToSql;
use satstream::satstream_postgres::types::{PgBigIntU32, PgNumericU64};
use satstream::satstream_postgres::FromPgRow;

use crate::query::{ApiError, BlockQuery, InscriptionQuery, Pagination};
use crate::responses::{
    InscriptionResponse, InscriptionTransferPerBlockResponse, LocationResponse,
    StatsBlockResponse,
};

/// Shared projection for every inscription read. Genesis fields come from the inscription row,
/// the rest reflects the sat's current location.
const INSCRIPTION_SELECT: &str = "
    SELECT
        i.inscription_id, i.number, i.classic_number, i.ordinal_number,
        i.block_height AS genesis_block_height, i.block_hash AS genesis_block_hash,
        i.tx_id AS genesis_tx_id, i.address AS genesis_address, i.fee AS genesis_fee,
        i.timestamp AS genesis_timestamp, i.mime_type, i.content_type, i.content_length,
        i.curse_type, i.recursive, i.metadata, i.metaprotocol, i.delegate, i.charms,
        s.rarity AS sat_rarity, s.coinbase_height AS sat_coinbase_height,
        cl.tx_id, cl.address, cl.output, cl.\"offset\",
        cur.value, cur.timestamp,
        ARRAY(SELECT r.ref_inscription_id FROM inscription_recursions r
            WHERE r.inscription_id = i.inscription_id) AS recursion_refs,
        ARRAY(SELECT p.parent_inscription_id FROM inscription_parents p
            WHERE p.inscription_id = i.inscription_id) AS parent_refs,
        COUNT(*) OVER () AS total
    FROM inscriptions i
    INNER JOIN satoshis s ON s.ordinal_number = i.ordinal_number
    INNER JOIN current_locations cl ON cl.ordinal_number = i.ordinal_number
    LEFT JOIN locations cur ON cur.ordinal_number = cl.ordinal_number
        AND cur.block_height = cl.block_height AND cur.tx_index = cl.tx_index
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InscriptionsOrderBy {
    Number,
    Rarity,
    Ordinal,
    GenesisBlockHeight,
}

impl InscriptionsOrderBy {
    pub fn parse(raw: &Option<String>) -> Result<Self, ApiError> {
        match raw.as_deref() {
            None | Some("genesis_block_height") => Ok(Self::GenesisBlockHeight),
            Some("number") => Ok(Self::Number),
            Some("rarity") => Ok(Self::Rarity),
            Some("ordinal") => Ok(Self::Ordinal),
            Some(other) => Err(ApiError::BadRequest(format!("invalid order_by: {other}"))),
        }
    }

    fn sql_column(&self) -> &'static str {
        match self {
            Self::Number => "i.number",
            Self::Rarity => "s.rarity",
            Self::Ordinal => "i.ordinal_number",
            Self::GenesisBlockHeight => "i.block_height",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn parse(raw: &Option<String>) -> Result<Self, ApiError> {
        match raw.as_deref() {
            None | Some("desc") => Ok(Self::Desc),
            Some("asc") => Ok(Self::Asc),
            Some(other) => Err(ApiError::BadRequest(format!("invalid order: {other}"))),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Default)]
pub struct InscriptionFilters {
    pub mime_types: Option<Vec<String>>,
    pub rarities: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub numbers: Option<Vec<i64>>,
    pub genesis_block: Option<BlockQuery>,
    pub from_genesis_block_height: Option<u64>,
    pub to_genesis_block_height: Option<u64>,
    pub from_genesis_timestamp: Option<u32>,
    pub to_genesis_timestamp: Option<u32>,
    pub from_sat_ordinal: Option<u64>,
    pub to_sat_ordinal: Option<u64>,
    pub from_sat_coinbase_height: Option<u64>,
    pub to_sat_coinbase_height: Option<u64>,
    pub from_number: Option<i64>,
    pub to_number: Option<i64>,
    pub output: Option<String>,
    pub addresses: Option<Vec<String>>,
    pub genesis_addresses: Option<Vec<String>>,
    pub cursed: Option<bool>,
    pub recursive: Option<bool>,
}

struct SqlConditions {
    conditions: Vec<String>,
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl SqlConditions {
    fn new() -> Self {
        SqlConditions {
            conditions: vec![],
            params: vec![],
        }
    }

    /// Adds a condition; `{}` in the template is replaced by the next parameter placeholder.
    fn push(&mut self, template: &str, param: Box<dyn ToSql + Sync + Send>) {
        self.params.push(param);
        self.conditions
            .push(template.replace("{}", &format!("${}", self.params.len())));
    }

    fn push_static(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
    }
}

fn inscription_conditions(filters: &InscriptionFilters) -> SqlConditions {
    let mut sql = SqlConditions::new();
    if let Some(mime_types) = &filters.mime_types {
        sql.push("i.mime_type = ANY({})", Box::new(mime_types.clone()));
    }
    if let Some(rarities) = &filters.rarities {
        sql.push("s.rarity = ANY({})", Box::new(rarities.clone()));
    }
    if let Some(ids) = &filters.ids {
        sql.push("i.inscription_id = ANY({})", Box::new(ids.clone()));
    }
    if let Some(numbers) = &filters.numbers {
        sql.push("i.number = ANY({})", Box::new(numbers.clone()));
    }
    match &filters.genesis_block {
        Some(BlockQuery::Height(height)) => {
            sql.push("i.block_height = {}", Box::new(PgNumericU64(*height)));
        }
        Some(BlockQuery::Hash(hash)) => {
            sql.push("i.block_hash = {}", Box::new(hash.clone()));
        }
        None => {}
    };
    if let Some(height) = filters.from_genesis_block_height {
        sql.push("i.block_height >= {}", Box::new(PgNumericU64(height)));
    }
    if let Some(height) = filters.to_genesis_block_height {
        sql.push("i.block_height <= {}", Box::new(PgNumericU64(height)));
    }
    if let Some(timestamp) = filters.from_genesis_timestamp {
        sql.push("i.timestamp >= {}", Box::new(PgBigIntU32(timestamp)));
    }
    if let Some(timestamp) = filters.to_genesis_timestamp {
        sql.push("i.timestamp <= {}", Box::new(PgBigIntU32(timestamp)));
    }
    if let Some(ordinal) = filters.from_sat_ordinal {
        sql.push("i.ordinal_number >= {}", Box::new(PgNumericU64(ordinal)));
    }
    if let Some(ordinal) = filters.to_sat_ordinal {
        sql.push("i.ordinal_number <= {}", Box::new(PgNumericU64(ordinal)));
    }
    if let Some(height) = filters.from_sat_coinbase_height {
        sql.push("s.coinbase_height >= {}", Box::new(PgNumericU64(height)));
    }
    if let Some(height) = filters.to_sat_coinbase_height {
        sql.push("s.coinbase_height <= {}", Box::new(PgNumericU64(height)));
    }
    if let Some(number) = filters.from_number {
        sql.push("i.number >= {}", Box::new(number));
    }
    if let Some(number) = filters.to_number {
        sql.push("i.number <= {}", Box::new(number));
    }
    if let Some(output) = &filters.output {
        sql.push("cl.output = {}", Box::new(output.clone()));
    }
    if let Some(addresses) = &filters.addresses {
        sql.push("cl.address = ANY({})", Box::new(addresses.clone()));
    }
    if let Some(addresses) = &filters.genesis_addresses {
        sql.push("i.address = ANY({})", Box::new(addresses.clone()));
    }
    match filters.cursed {
        Some(true) => sql.push_static("i.classic_number < 0"),
        Some(false) => sql.push_static("i.classic_number >= 0"),
        None => {}
    };
    if let Some(recursive) = filters.recursive {
        sql.push("i.recursive = {}", Box::new(recursive));
    }
    sql
}

pub async fn get_inscriptions<T: GenericClient>(
    filters: &InscriptionFilters,
    order_by: InscriptionsOrderBy,
    order: Order,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<InscriptionResponse>, u64), String> {
    let sql = inscription_conditions(filters);
    let statement = format!(
        "{INSCRIPTION_SELECT} {} ORDER BY {} {} LIMIT {} OFFSET {}",
        sql.where_clause(),
        order_by.sql_column(),
        order.sql(),
        pagination.limit,
        pagination.offset,
    );
    let rows = client
        .query(&statement, &sql.param_refs())
        .await
        .map_err(|e| format!("get_inscriptions: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter().map(InscriptionResponse::from_pg_row).collect(),
        total as u64,
    ))
}

pub async fn get_inscription<T: GenericClient>(
    query: &InscriptionQuery,
    client: &T,
) -> Result<Option<InscriptionResponse>, String> {
    let statement = match query {
        InscriptionQuery::Id(_) => format!("{INSCRIPTION_SELECT} WHERE i.inscription_id = $1"),
        InscriptionQuery::Number(_) => format!("{INSCRIPTION_SELECT} WHERE i.number = $1"),
    };
    let row = match query {
        InscriptionQuery::Id(id) => client.query_opt(&statement, &[&id]).await,
        InscriptionQuery::Number(number) => client.query_opt(&statement, &[&number]).await,
    }
    .map_err(|e| format!("get_inscription: {e}"))?;
    Ok(row.map(|r| InscriptionResponse::from_pg_row(&r)))
}

/// Content bytes plus the metadata needed to serve them. When a delegate is set and the stored
/// content is empty, the route serves the delegate's content instead.
pub async fn get_inscription_content<T: GenericClient>(
    query: &InscriptionQuery,
    client: &T,
) -> Result<Option<(Vec<u8>, String, Option<String>)>, String> {
    let statement = match query {
        InscriptionQuery::Id(_) => {
            "SELECT content, content_type, delegate FROM inscriptions WHERE inscription_id = $1"
        }
        InscriptionQuery::Number(_) => {
            "SELECT content, content_type, delegate FROM inscriptions WHERE number = $1"
        }
    };
    let row = match query {
        InscriptionQuery::Id(id) => client.query_opt(statement, &[&id]).await,
        InscriptionQuery::Number(number) => client.query_opt(statement, &[&number]).await,
    }
    .map_err(|e| format!("get_inscription_content: {e}"))?;
    Ok(row.map(|r| (r.get("content"), r.get("content_type"), r.get("delegate"))))
}

/// The full location history of an inscription, newest first. The total includes the genesis
/// location.
pub async fn get_inscription_transfers<T: GenericClient>(
    query: &InscriptionQuery,
    pagination: &Pagination,
    client: &T,
) -> Result<Option<(Vec<LocationResponse>, u64)>, String> {
    let statement = match query {
        InscriptionQuery::Id(_) => {
            "SELECT ordinal_number, block_height, tx_index FROM inscriptions WHERE inscription_id = $1"
        }
        InscriptionQuery::Number(_) => {
            "SELECT ordinal_number, block_height, tx_index FROM inscriptions WHERE number = $1"
        }
    };
    let genesis = match query {
        InscriptionQuery::Id(id) => client.query_opt(statement, &[&id]).await,
        InscriptionQuery::Number(number) => client.query_opt(statement, &[&number]).await,
    }
    .map_err(|e| format!("get_inscription_transfers: {e}"))?;
    let Some(genesis) = genesis else {
        return Ok(None);
    };
    let ordinal_number: PgNumericU64 = genesis.get("ordinal_number");
    let genesis_block_height: PgNumericU64 = genesis.get("block_height");
    let genesis_tx_index: PgBigIntU32 = genesis.get("tx_index");

    let rows = client
        .query(
            &format!(
                "SELECT l.*, COUNT(*) OVER () AS total FROM locations l
                WHERE l.ordinal_number = $1
                AND (l.block_height > $2 OR (l.block_height = $2 AND l.tx_index >= $3))
                ORDER BY l.block_height DESC, l.tx_index DESC
                LIMIT {} OFFSET {}",
                pagination.limit, pagination.offset
            ),
            &[&ordinal_number, &genesis_block_height, &genesis_tx_index],
        )
        .await
        .map_err(|e| format!("get_inscription_transfers: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok(Some((
        rows.iter()
            .map(|r| LocationResponse::from_location(&DbLocation::from_pg_row(r)))
            .collect(),
        total as u64,
    )))
}

/// Post-genesis transfers that happened at one block, each with its from/to location projections.
pub async fn get_transfers_per_block<T: GenericClient>(
    block: &BlockQuery,
    pagination: &Pagination,
    client: &T,
) -> Result<Option<(Vec<InscriptionTransferPerBlockResponse>, u64)>, String> {
    let block_height = match block {
        BlockQuery::Height(height) => {
            let known = client
                .query_opt(
                    "SELECT block_height FROM counts_by_block WHERE block_height = $1",
                    &[&PgNumericU64(*height)],
                )
                .await
                .map_err(|e| format!("get_transfers_per_block: {e}"))?;
            if known.is_none() {
                return Ok(None);
            }
            *height
        }
        BlockQuery::Hash(hash) => {
            let row = client
                .query_opt(
                    "SELECT block_height FROM counts_by_block WHERE block_hash = $1",
                    &[hash],
                )
                .await
                .map_err(|e| format!("get_transfers_per_block: {e}"))?;
            let Some(row) = row else {
                return Ok(None);
            };
            row.get::<&str, PgNumericU64>("block_height").0
        }
    };

    let rows = client
        .query(
            &format!(
                "SELECT t.*, COUNT(*) OVER () AS total FROM inscription_transfers t
                WHERE t.block_height = $1
                ORDER BY t.block_transfer_index ASC
                LIMIT {} OFFSET {}",
                pagination.limit, pagination.offset
            ),
            &[&PgNumericU64(block_height)],
        )
        .await
        .map_err(|e| format!("get_transfers_per_block: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);

    let mut results = vec![];
    for row in rows.iter() {
        let ordinal_number: PgNumericU64 = row.get("ordinal_number");
        let tx_index: PgBigIntU32 = row.get("tx_index");
        let from_block_height: PgNumericU64 = row.get("from_block_height");
        let from_tx_index: PgBigIntU32 = row.get("from_tx_index");
        let to_location = satstream::db::ordinals_pg::get_location(
            ordinal_number.0,
            block_height,
            tx_index.0,
            client,
        )
        .await?
        .ok_or("get_transfers_per_block: missing destination location".to_string())?;
        let from_location = satstream::db::ordinals_pg::get_location(
            ordinal_number.0,
            from_block_height.0,
            from_tx_index.0,
            client,
        )
        .await?
        .ok_or("get_transfers_per_block: missing source location".to_string())?;
        results.push(InscriptionTransferPerBlockResponse {
            id: row.get("inscription_id"),
            number: row.get("number"),
            from: LocationResponse::from_location(&from_location),
            to: LocationResponse::from_location(&to_location),
        });
    }
    Ok(Some((results, total as u64)))
}

/// Inscriptions carried by a sat, in reverse inscription-number order. Reinscriptions all share
/// the sat's current location.
pub async fn get_sat_inscriptions<T: GenericClient>(
    ordinal_number: u64,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<InscriptionResponse>, u64), String> {
    let statement = format!(
        "{INSCRIPTION_SELECT} WHERE i.ordinal_number = $1
        ORDER BY i.number DESC LIMIT {} OFFSET {}",
        pagination.limit, pagination.offset
    );
    let rows = client
        .query(&statement, &[&PgNumericU64(ordinal_number)])
        .await
        .map_err(|e| format!("get_sat_inscriptions: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter().map(InscriptionResponse::from_pg_row).collect(),
        total as u64,
    ))
}

pub async fn get_stats_inscriptions<T: GenericClient>(
    from_block_height: Option<u64>,
    to_block_height: Option<u64>,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<StatsBlockResponse>, u64), String> {
    let mut sql = SqlConditions::new();
    if let Some(height) = from_block_height {
        sql.push("block_height >= {}", Box::new(PgNumericU64(height)));
    }
    if let Some(height) = to_block_height {
        sql.push("block_height <= {}", Box::new(PgNumericU64(height)));
    }
    let statement = format!(
        "SELECT *, COUNT(*) OVER () AS total FROM counts_by_block {}
        ORDER BY block_height DESC LIMIT {} OFFSET {}",
        sql.where_clause(),
        pagination.limit,
        pagination.offset
    );
    let rows = client
        .query(&statement, &sql.param_refs())
        .await
        .map_err(|e| format!("get_stats_inscriptions: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter().map(StatsBlockResponse::from_pg_row).collect(),
        total as u64,
    ))
}

pub struct StatusNumbers {
    pub block_height: Option<u64>,
    pub max_inscription_number: Option<i64>,
    pub max_cursed_inscription_number: Option<i64>,
}

pub async fn get_status_numbers<T: GenericClient>(client: &T) -> Result<StatusNumbers, String> {
    let tip = client
        .query_opt("SELECT block_height FROM chain_tip", &[])
        .await
        .map_err(|e| format!("get_status_numbers: {e}"))?;
    let block_height = tip
        .and_then(|r| r.get::<&str, Option<PgNumericU64>>("block_height"))
        .map(|h| h.0);
    let numbers = client
        .query_one(
            "SELECT MAX(number) AS max_number,
                MIN(classic_number) FILTER (WHERE classic_number < 0) AS max_cursed_number
            FROM inscriptions",
            &[],
        )
        .await
        .map_err(|e| format!("get_status_numbers: {e}"))?;
    Ok(StatusNumbers {
        block_height,
        max_inscription_number: numbers.get("max_number"),
        max_cursed_inscription_number: numbers.get("max_cursed_number"),
    })
}
