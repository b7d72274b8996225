pub mod brc20;
pub mod inscriptions;
pub mod sats;
pub mod stats;

use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value as JsonValue};
use rocket::State;
use satstream::satstream_postgres::deadpool_postgres::{Object, Pool};
use satstream::satstream_postgres::pg_pool_client;
use satstream::try_error;
use satstream::utils::Context;

use crate::db::ordinals_queries;
use crate::query::{ok_response, ApiError};
use crate::responses::StatusResponse;
use crate::ApiState;

pub(crate) async fn pg_client(pool: &Pool) -> Result<Object, ApiError> {
    pg_pool_client(pool).await.map_err(ApiError::Internal)
}

pub(crate) fn brc20_pool(state: &ApiState) -> Result<&Pool, ApiError> {
    state
        .brc20_pool
        .as_ref()
        .ok_or(ApiError::BadRequest("BRC-20 indexing is not enabled".to_string()))
}

/// Maps a query outcome to its HTTP response, keeping internal error details out of the body.
pub(crate) fn respond(
    result: Result<JsonValue, ApiError>,
    ctx: &Context,
) -> Custom<Json<JsonValue>> {
    match result {
        Ok(value) => ok_response(value),
        Err(e) => {
            if let ApiError::Internal(reason) = &e {
                try_error!(ctx, "API query failed: {reason}");
            }
            e.into_response()
        }
    }
}

pub(crate) fn to_json<T: serde::Serialize>(value: T) -> Result<JsonValue, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

#[get("/v1")]
pub async fn handle_status(state: &State<ApiState>) -> Custom<Json<JsonValue>> {
    let result = async {
        let client = pg_client(&state.ordinals_pool).await?;
        let numbers = ordinals_queries::get_status_numbers(&client).await?;
        to_json(StatusResponse {
            server_version: state.server_version.clone(),
            status: "ready".to_string(),
            block_height: numbers.block_height,
            max_inscription_number: numbers.max_inscription_number,
            max_cursed_inscription_number: numbers.max_cursed_inscription_number,
        })
    }
    .await;
    respond(result, &state.ctx)
}
