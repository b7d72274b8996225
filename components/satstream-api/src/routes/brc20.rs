use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value as JsonValue};
use rocket::State;
use satstream::core::meta_protocols::brc20::u128_amount_to_decimals_str;

use crate::db::brc20_queries::{self, ActivityFilters, TokensOrderBy, VALID_OPERATIONS};
use crate::query::{ApiError, Pagination};
use crate::responses::{PaginatedResponse, TokenDetailsResponse, TokenResponse, TokenSupplyResponse};
use crate::routes::{brc20_pool, pg_client, respond, to_json};
use crate::ApiState;

#[get("/brc-20/tokens?<ticker>&<order_by>&<limit>&<offset>")]
pub async fn handle_tokens_index(
    ticker: Option<Vec<String>>,
    order_by: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        let order_by = TokensOrderBy::parse(&order_by)?;
        let client = pg_client(brc20_pool(state)?).await?;
        let (results, total) =
            brc20_queries::get_tokens(&ticker, order_by, &pagination, &client).await?;
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

#[get("/brc-20/tokens/<ticker>")]
pub async fn handle_token_show(ticker: &str, state: &State<ApiState>) -> Custom<Json<JsonValue>> {
    let result = async {
        let client = pg_client(brc20_pool(state)?).await?;
        let token = brc20_queries::get_token(ticker, &client)
            .await?
            .ok_or(ApiError::NotFound)?;
        let holders = brc20_queries::get_token_holders_count(&token.ticker, &client).await?;
        to_json(TokenDetailsResponse {
            supply: TokenSupplyResponse {
                max_supply: u128_amount_to_decimals_str(token.max.0, token.decimals.0),
                minted_supply: u128_amount_to_decimals_str(token.minted_supply.0, token.decimals.0),
                holders,
            },
            token: TokenResponse::from_token(&token),
        })
    }
    .await;
    respond(result, &state.ctx)
}

#[get("/brc-20/tokens/<ticker>/holders?<limit>&<offset>")]
pub async fn handle_token_holders(
    ticker: &str,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(brc20_pool(state)?).await?;
        let token = brc20_queries::get_token(ticker, &client)
            .await?
            .ok_or(ApiError::NotFound)?;
        let (results, total) =
            brc20_queries::get_token_holders(&token.ticker, &pagination, &client).await?;
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

#[get("/brc-20/activity?<ticker>&<operation>&<address>&<block_height>&<limit>&<offset>")]
pub async fn handle_activity(
    ticker: Option<String>,
    operation: Option<Vec<String>>,
    address: Option<String>,
    block_height: Option<u64>,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        if let Some(operations) = &operation {
            for op in operations.iter() {
                if !VALID_OPERATIONS.contains(&op.as_str()) {
                    return Err(ApiError::BadRequest(format!("invalid operation: {op}")));
                }
            }
        }
        let filters = ActivityFilters {
            ticker,
            operations: operation,
            address,
            block_height,
        };
        let client = pg_client(brc20_pool(state)?).await?;
        let (results, total) = brc20_queries::get_activity(&filters, &pagination, &client).await?;
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

#[get("/brc-20/balances/<address>?<ticker>&<block_height>&<limit>&<offset>")]
pub async fn handle_balances(
    address: &str,
    ticker: Option<Vec<String>>,
    block_height: Option<u64>,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(brc20_pool(state)?).await?;
        let (results, total) =
            brc20_queries::get_balances(address, block_height, &ticker, &pagination, &client)
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
