use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value as JsonValue};
use rocket::State;
use satstream::ord::sat::Sat;

use crate::db::ordinals_queries;
use crate::query::{parse_ordinal_number, Pagination};
use crate::responses::{PaginatedResponse, SatResponse};
use crate::routes::{pg_client, respond, to_json};
use crate::ApiState;

#[get("/v1/sats/<ordinal>")]
pub async fn handle_sat_show(ordinal: &str, state: &State<ApiState>) -> Custom<Json<JsonValue>> {
    let result = async {
        let ordinal_number = parse_ordinal_number(ordinal)?;
        to_json(SatResponse::from_sat(Sat(ordinal_number)))
    }
    .await;
    respond(result, &state.ctx)
}

#[get("/v1/sats/<ordinal>/inscriptions?<limit>&<offset>")]
pub async fn handle_sat_inscriptions(
    ordinal: &str,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let ordinal_number = parse_ordinal_number(ordinal)?;
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (results, total) =
            ordinals_queries::get_sat_inscriptions(ordinal_number, &pagination, &client).await?;
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
