use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value as JsonValue};
use rocket::State;

use crate::db::ordinals_queries;
use crate::query::Pagination;
use crate::responses::PaginatedResponse;
use crate::routes::{pg_client, respond, to_json};
use crate::ApiState;

#[get("/v1/stats/inscriptions?<from_block_height>&<to_block_height>&<limit>&<offset>")]
pub async fn handle_stats_inscriptions(
    from_block_height: Option<u64>,
    to_block_height: Option<u64>,
    limit: Option<usize>,
    offset: Option<usize>,
    state: &State<ApiState>,
) -> Custom<Json<JsonValue>> {
    let result = async {
        let pagination = Pagination::new(limit, offset)?;
        let client = pg_client(&state.ordinals_pool).await?;
        let (results, total) = ordinals_queries::get_stats_inscriptions(
            from_block_height,
            to_block_height,
            &pagination,
            &client,
        )
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
