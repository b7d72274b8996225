use satstream::core::meta_protocols::brc20::models::DbToken;
use satstream::satstream_postgres::deadpool_postgres::GenericClient;
use satstream::satstream_postgres::tokio_postgres::types::ToSql;
use satstream::satstream_postgres::types::{PgNumericU128, PgNumericU64, PgSmallIntU8};
use satstream::satstream_postgres::FromPgRow;
use satstream::core::meta_protocols::brc20::u128_amount_to_decimals_str;

use crate::query::{ApiError, Pagination};
use crate::responses::{ActivityResponse, BalanceResponse, HolderResponse, TokenResponse};

pub const VALID_OPERATIONS: [&str; 5] =
    ["deploy", "mint", "transfer", "transfer_send", "transfer_receive"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokensOrderBy {
    Index,
    TxCount,
}

impl TokensOrderBy {
    pub fn parse(raw: &Option<String>) -> Result<Self, ApiError> {
        match raw.as_deref() {
            None | Some("index") => Ok(Self::Index),
            Some("tx_count") => Ok(Self::TxCount),
            Some(other) => Err(ApiError::BadRequest(format!("invalid order_by: {other}"))),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::Index => "block_height ASC, tx_index ASC",
            Self::TxCount => "tx_count DESC",
        }
    }
}

fn ticker_prefix_clause(
    column: &str,
    prefixes: &Option<Vec<String>>,
    params: &mut Vec<Box<dyn ToSql + Sync + Send>>,
) -> Option<String> {
    let prefixes = prefixes.as_ref()?;
    if prefixes.is_empty() {
        return None;
    }
    let mut clauses = vec![];
    for prefix in prefixes.iter() {
        params.push(Box::new(format!("{}%", prefix.to_lowercase())));
        clauses.push(format!("{column} LIKE ${}", params.len()));
    }
    Some(format!("({})", clauses.join(" OR ")))
}

pub async fn get_tokens<T: GenericClient>(
    ticker_prefixes: &Option<Vec<String>>,
    order_by: TokensOrderBy,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<TokenResponse>, u64), String> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = vec![];
    let where_clause = match ticker_prefix_clause("ticker", ticker_prefixes, &mut params) {
        Some(clause) => format!("WHERE {clause}"),
        None => "".to_string(),
    };
    let statement = format!(
        "SELECT *, COUNT(*) OVER () AS total FROM tokens {where_clause}
        ORDER BY {} LIMIT {} OFFSET {}",
        order_by.sql(),
        pagination.limit,
        pagination.offset
    );
    let param_refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
    let rows = client
        .query(&statement, &param_refs)
        .await
        .map_err(|e| format!("get_tokens: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter()
            .map(|r| TokenResponse::from_token(&DbToken::from_pg_row(r)))
            .collect(),
        total as u64,
    ))
}

pub async fn get_token<T: GenericClient>(
    ticker: &str,
    client: &T,
) -> Result<Option<DbToken>, String> {
    let row = client
        .query_opt(
            "SELECT * FROM tokens WHERE ticker = $1",
            &[&ticker.to_lowercase()],
        )
        .await
        .map_err(|e| format!("get_token: {e}"))?;
    Ok(row.map(|r| DbToken::from_pg_row(&r)))
}

/// Number of addresses holding a positive balance of the token.
pub async fn get_token_holders_count<T: GenericClient>(
    ticker: &str,
    client: &T,
) -> Result<i64, String> {
    let row = client
        .query_one(
            "SELECT COUNT(*) AS count FROM balances WHERE ticker = $1 AND total_balance > 0",
            &[&ticker.to_lowercase()],
        )
        .await
        .map_err(|e| format!("get_token_holders_count: {e}"))?;
    Ok(row.get("count"))
}

pub async fn get_token_holders<T: GenericClient>(
    ticker: &str,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<HolderResponse>, u64), String> {
    let rows = client
        .query(
            &format!(
                "SELECT b.address, b.total_balance, t.decimals, COUNT(*) OVER () AS total
                FROM balances b
                INNER JOIN tokens t ON t.ticker = b.ticker
                WHERE b.ticker = $1 AND b.total_balance > 0
                ORDER BY b.total_balance DESC
                LIMIT {} OFFSET {}",
                pagination.limit, pagination.offset
            ),
            &[&ticker.to_lowercase()],
        )
        .await
        .map_err(|e| format!("get_token_holders: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter()
            .map(|r| {
                let decimals: PgSmallIntU8 = r.get("decimals");
                let balance: PgNumericU128 = r.get("total_balance");
                HolderResponse {
                    address: r.get("address"),
                    overall_balance: u128_amount_to_decimals_str(balance.0, decimals.0),
                }
            })
            .collect(),
        total as u64,
    ))
}

#[derive(Default)]
pub struct ActivityFilters {
    pub ticker: Option<String>,
    pub operations: Option<Vec<String>>,
    pub address: Option<String>,
    pub block_height: Option<u64>,
}

/// BRC-20 operation log, newest first. The address filter matches the operation's own address,
/// which is the sender on send-style rows and the receiver on receive-style rows, so one query
/// covers a participant's full history.
pub async fn get_activity<T: GenericClient>(
    filters: &ActivityFilters,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<ActivityResponse>, u64), String> {
    let mut conditions: Vec<String> = vec![];
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = vec![];
    if let Some(ticker) = &filters.ticker {
        params.push(Box::new(ticker.to_lowercase()));
        conditions.push(format!("o.ticker = ${}", params.len()));
    }
    if let Some(operations) = &filters.operations {
        params.push(Box::new(operations.clone()));
        conditions.push(format!("o.operation = ANY(${})", params.len()));
    }
    if let Some(address) = &filters.address {
        params.push(Box::new(address.clone()));
        conditions.push(format!("o.address = ${}", params.len()));
    }
    if let Some(block_height) = filters.block_height {
        params.push(Box::new(PgNumericU64(block_height)));
        conditions.push(format!("o.block_height = ${}", params.len()));
    }
    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let statement = format!(
        "SELECT o.*, t.decimals, t.display_ticker, COUNT(*) OVER () AS total
        FROM operations o
        INNER JOIN tokens t ON t.ticker = o.ticker
        {where_clause}
        ORDER BY o.block_height DESC, o.tx_index DESC
        LIMIT {} OFFSET {}",
        pagination.limit, pagination.offset
    );
    let param_refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
    let rows = client
        .query(&statement, &param_refs)
        .await
        .map_err(|e| format!("get_activity: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter().map(ActivityResponse::from_pg_row).collect(),
        total as u64,
    ))
}

/// Current balances of an address, or balances as of the end of a block when `block_height` is
/// given; the latter reads `balances_history` so it cannot race an in-progress apply.
pub async fn get_balances<T: GenericClient>(
    address: &str,
    block_height: Option<u64>,
    ticker_prefixes: &Option<Vec<String>>,
    pagination: &Pagination,
    client: &T,
) -> Result<(Vec<BalanceResponse>, u64), String> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = vec![Box::new(address.to_string())];
    let statement = match block_height {
        Some(block_height) => {
            params.push(Box::new(PgNumericU64(block_height)));
            let prefix_clause = match ticker_prefix_clause("bh.ticker", ticker_prefixes, &mut params)
            {
                Some(clause) => format!("AND {clause}"),
                None => "".to_string(),
            };
            format!(
                "SELECT b.*, COUNT(*) OVER () AS total FROM (
                    SELECT DISTINCT ON (bh.ticker)
                        bh.ticker, bh.avail_balance, bh.trans_balance, bh.total_balance,
                        t.decimals, t.display_ticker
                    FROM balances_history bh
                    INNER JOIN tokens t ON t.ticker = bh.ticker
                    WHERE bh.address = $1 AND bh.block_height <= $2 {prefix_clause}
                    ORDER BY bh.ticker, bh.block_height DESC
                ) AS b
                WHERE b.total_balance > 0
                ORDER BY b.ticker
                LIMIT {} OFFSET {}",
                pagination.limit, pagination.offset
            )
        }
        None => {
            let prefix_clause = match ticker_prefix_clause("b.ticker", ticker_prefixes, &mut params)
            {
                Some(clause) => format!("AND {clause}"),
                None => "".to_string(),
            };
            format!(
                "SELECT b.ticker, b.avail_balance, b.trans_balance, b.total_balance,
                    t.decimals, t.display_ticker, COUNT(*) OVER () AS total
                FROM balances b
                INNER JOIN tokens t ON t.ticker = b.ticker
                WHERE b.address = $1 AND b.total_balance > 0 {prefix_clause}
                ORDER BY b.ticker
                LIMIT {} OFFSET {}",
                pagination.limit, pagination.offset
            )
        }
    };
    let param_refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
    let rows = client
        .query(&statement, &param_refs)
        .await
        .map_err(|e| format!("get_balances: {e}"))?;
    let total = rows.first().map(|r| r.get::<&str, i64>("total")).unwrap_or(0);
    Ok((
        rows.iter().map(BalanceResponse::from_pg_row).collect(),
        total as u64,
    ))
}
