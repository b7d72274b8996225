use rocket::http::ContentType;
use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value as JsonValue};
use rocket::State;

use crate::db::ordinals_queries::{
    self, InscriptionFilters, InscriptionsOrderBy, Order,
};
use crate::query::{parse_rarities, ApiError, BlockQuery, InscriptionQuery, Pagination};
use crate::responses::PaginatedResponse;
use crate::routes::{pg_client, respond, to_json};
use crate::ApiState;

#[get("/v1/inscriptions?<mime_type>&<rarity>&<id>&<number>&<genesis_block>&\
    <from_genesis_block_height>&<to_genesis_block_height>&<from_genesis_timestamp>&\
    <to_genesis_timestamp>&<from_sat_ordinal>&<to_sat_ordinal>&<from_sat_coinbase_height>&\
    <to_sat_coinbase_height>&<from_number>&<to_number>&<output>&<address>&<genesis_address>&\
    <cursed>&<recursive>&<order_by>&<order>&<limit>&<offset>")]
#[allow(clippy::too_many_arguments)]
pub async fn handle_inscriptions_index(
    mime_type: Option<Vec<String>>,
    rarity: Option<Vec<String>>,
    id: Option<Vec<String>>,
    number: Option<Vec<i64>>,
    genesis_block: Option<String>,
    from_genesis_block_height: Option<u64>,
    to_genesis_block_height: Option<u64>,
    from_genesis_timestamp: Option<u32>,
    to_genesis_timestamp: Option<u32>,
    from_sat_ordinal: Option<u64>,
    to_sat_ordinal: Option<u64>,
    from_sat_coinbase_height: Option<u64>,
    to_sat_coinbase_height: Option<u64>,
    from_number: Option<i64>,
    to_number: Option<i64>,
    output: Option<String>,
    address: Option<Vec<String>>,
    genesis_address: Option<Vec<String>>,
    cursed: Option<bool>,
    recursive: Option<bool>,
    order_by: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        let filters = InscriptionFilters {
            mime_types: mime_type,
            rarities: parse_rarities(&rarity)?,
            ids: id,
            numbers: number,
            genesis_block: match &genesis_block {
                Some(raw) => Some(BlockQuery::parse(raw)?),
                None => None,
            },
            from_genesis_block_height,
            to_genesis_block_height,
            from_genesis_timestamp,
            to_genesis_timestamp,
            from_sat_ordinal,
            to_sat_ordinal,
            from_sat_coinbase_height,
            to_sat_coinbase_height,
            from_number,
            to_number,
            output,
            addresses: address,
            genesis_addresses: genesis_address,
            cursed,
            recursive,
        };
        let order_by = InscriptionsOrderBy::parse(&order_by)?;
        let order = Order::parse(&order)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (results, total) =
            ordinals_queries::get_inscriptions(&filters, order_by, order, &pagination, &client)
                .await?;
        to_json(PaginatedResponse {
            limit: pagination.limit,
            offset: pagination.offset,
            total,
            results,
        })
    }
    .await;
    respond(result, &state.ctx)
}

#[get("/v1/inscriptions/<query>")]
pub async fn handle_inscription_show(
    query: &str,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let query = InscriptionQuery::parse(query)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let inscription = ordinals_queries::get_inscription(&query, &client)
            .await?
            .ok_or(ApiError::NotFound)?;
        to_json(inscription)
    }
    .await;
    respond(result, &state.ctx)
}

#[get("/v1/inscriptions/<query>/content")]
pub async fn handle_inscription_content(
    query: &str,
    state: &State<ApiState>,
) -> Result<(ContentType, Vec<u8>), Custom<Json<JsonValue>>> {
    let result = async {
        let query = InscriptionQuery::parse(query)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (mut content, mut content_type, delegate) =
            ordinals_queries::get_inscription_content(&query, &client)
                .await?
                .ok_or(ApiError::NotFound)?;
        // A delegating inscription has no content of its own; serve the delegate's.
        if content.is_empty() {
            if let Some(delegate) = delegate {
                if let Some((delegate_content, delegate_content_type, _)) =
                    ordinals_queries::get_inscription_content(
                        &InscriptionQuery::Id(delegate),
                        &client,
                    )
                    .await?
                {
                    content = delegate_content;
                    content_type = delegate_content_type;
                }
            }
        }
        Ok((content, content_type))
    }
    .await;
    match result {
        Ok((content, content_type)) => Ok((
            ContentType::parse_flexible(&content_type).unwrap_or(ContentType::Binary),
            content,
        )),
        Err(e) => Err(respond(Err(e), &state.ctx)),
    }
}

#[get("/v1/inscriptions/<query>/transfers?<limit>&<offset>")]
pub async fn handle_inscription_transfers(
    query: &str,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let query = InscriptionQuery::parse(query)?;
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (results, total) =
            ordinals_queries::get_inscription_transfers(&query, &pagination, &client)
                .await?
                .ok_or(ApiError::NotFound)?;
        to_json(PaginatedResponse {
            limit: pagination.limit,
            offset: pagination.offset,
            total,
            results,
        })
    }
    .await;
    respond(result, &state.ctx)
}

#[get("/v1/inscriptions/transfers?<block>&<limit>&<offset>")]
pub async fn handle_transfers_per_block(
    block: &str,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let block = BlockQuery::parse(block)?;
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (results, total) =
            ordinals_queries::get_transfers_per_block(&block, &pagination, &client)
                .await?
                .ok_or(ApiError::NotFound)?;
        to_json(PaginatedResponse {
            limit: pagination.limit,
            offset: pagination.offset,
            total,
            results,
        })
    }
    .await;
    respond(result, &state.ctx)
}
