use std::str::FromStr;

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::{json, Json, Value as JsonValue};
use satstream::ord::rarity::Rarity;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 60;

/// A failed query, mapped to its HTTP response. Validation problems are the caller's fault (400),
/// unknown entities are 404, anything else is a 500 with the reason kept server-side.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl ApiError {
    pub fn into_response(self) -> Custom<Json<JsonValue>> {
        match self {
            ApiError::BadRequest(reason) => {
                Custom(Status::BadRequest, Json(json!({ "error": reason })))
            }
            ApiError::NotFound => Custom(Status::NotFound, Json(json!({ "error": "Not found" }))),
            ApiError::Internal(_) => Custom(
                Status::InternalServerError,
                Json(json!({ "error": "Internal server error" })),
            ),
        }
    }
}

impl From<String> for ApiError {
    fn from(e: String) -> Self {
        ApiError::Internal(e)
    }
}

pub fn ok_response(value: JsonValue) -> Custom<Json<JsonValue>> {
    Custom(Status::Ok, Json(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Result<Self, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Pagination {
            limit,
            offset: offset.unwrap_or(0),
        })
    }
}

/// Identifier used by the inscription endpoints: an inscription id or a signed inscription
/// number.
#[derive(Debug)]
pub enum InscriptionQuery {
    Id(String),
    Number(i64),
}

impl InscriptionQuery {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        if raw.chars().all(|c| c.is_ascii_digit() || c == '-') {
            let number = raw
                .parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("invalid inscription number: {raw}")))?;
            return Ok(InscriptionQuery::Number(number));
        }
        let id = satstream::ord::inscription_id::InscriptionId::from_str(raw)
            .map_err(ApiError::BadRequest)?;
        Ok(InscriptionQuery::Id(id.to_string()))
    }
}

/// Identifier used by the per-block transfers endpoint: a block height or a block hash.
#[derive(Debug)]
pub enum BlockQuery {
    Height(u64),
    Hash(String),
}

impl BlockQuery {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        if raw.chars().all(|c| c.is_ascii_digit()) {
            let height = raw
                .parse::<u64>()
                .map_err(|_| ApiError::BadRequest(format!("invalid block height: {raw}")))?;
            return Ok(BlockQuery::Height(height));
        }
        if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(BlockQuery::Hash(raw.to_lowercase()));
        }
        Err(ApiError::BadRequest(format!("invalid block: {raw}")))
    }
}

pub fn parse_rarities(raw: &Option<Vec<String>>) -> Result<Option<Vec<String>>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut rarities = vec![];
    for value in raw.iter() {
        let rarity = Rarity::from_str(value).map_err(ApiError::BadRequest)?;
        rarities.push(rarity.as_str().to_string());
    }
    Ok(Some(rarities))
}

pub fn parse_ordinal_number(raw: &str) -> Result<u64, ApiError> {
    let ordinal_number = raw
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid ordinal number: {raw}")))?;
    satstream::ord::sat::Sat::from_ordinal(ordinal_number)
        .map_err(ApiError::BadRequest)?;
    Ok(ordinal_number)
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{ApiError, BlockQuery, InscriptionQuery, Pagination};

    #[test]
    fn caps_pagination_limit() {
        assert!(Pagination::new(Some(60), None).is_ok());
        assert!(Pagination::new(Some(61), None).is_err());
        assert!(Pagination::new(Some(0), None).is_err());
        let page = Pagination::new(None, Some(40)).unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 40);
    }

    #[test]
    fn parses_inscription_queries() {
        assert!(matches!(
            InscriptionQuery::parse("-7"),
            Ok(InscriptionQuery::Number(-7))
        ));
        assert!(matches!(
            InscriptionQuery::parse(
                "38c46a8bf7ec90bc7f6b797e7dc84baa97f4e5fd4286b92fe1b50176d03b18dci0"
            ),
            Ok(InscriptionQuery::Id(_))
        ));
        assert!(InscriptionQuery::parse("not-a-thing").is_err());
    }

    #[test_case("775617" => matches Ok(BlockQuery::Height(775617)); "height")]
    #[test_case("00000000000000000002d8ba402150b259ddb2b30a1d32ab4a881d4653bceb5b" => matches Ok(BlockQuery::Hash(_)); "hash")]
    #[test_case("nope" => matches Err(ApiError::BadRequest(_)); "garbage")]
    fn parses_block_queries(raw: &str) -> Result<BlockQuery, ApiError> {
        BlockQuery::parse(raw)
    }

    #[test]
    fn rejects_out_of_range_ordinals() {
        assert!(super::parse_ordinal_number("2099999997689999").is_ok());
        assert!(super::parse_ordinal_number("2099999997690000").is_err());
        assert!(super::parse_ordinal_number("-1").is_err());
    }
}
