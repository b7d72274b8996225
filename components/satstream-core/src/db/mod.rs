pub mod models;
pub mod ordinals_pg;

use config::Config;
use satstream_postgres::pg_connect_with_retry;
use satstream_postgres::tokio_postgres;

use crate::core::meta_protocols::brc20::brc20_pg;
use crate::utils::Context;
use crate::{try_info, try_warn};

pub async fn migrate_dbs(config: &Config, ctx: &Context) -> Result<(), String> {
    let ordinals = config
        .ordinals
        .as_ref()
        .ok_or("Config entry for `ordinals` not found".to_string())?;
    {
        try_info!(ctx, "Running ordinals DB migrations");
        let mut pg_client = pg_connect_with_retry(&ordinals.db).await;
        ordinals_pg::migrate(&mut pg_client).await?;
    }
    if let Some(brc20) = config.ordinals_brc20_config() {
        try_info!(ctx, "Running brc20 DB migrations");
        let mut pg_client = pg_connect_with_retry(&brc20.db).await;
        brc20_pg::migrate(&mut pg_client).await?;
    }
    Ok(())
}

pub async fn reset_dbs(config: &Config, ctx: &Context) -> Result<(), String> {
    let ordinals = config
        .ordinals
        .as_ref()
        .ok_or("Config entry for `ordinals` not found".to_string())?;
    {
        try_warn!(ctx, "Resetting ordinals DB");
        let mut pg_client = pg_connect_with_retry(&ordinals.db).await;
        pg_reset_db(&mut pg_client).await?;
    }
    if let Some(brc20) = config.ordinals_brc20_config() {
        try_warn!(ctx, "Resetting brc20 DB");
        let mut pg_client = pg_connect_with_retry(&brc20.db).await;
        pg_reset_db(&mut pg_client).await?;
    }
    Ok(())
}

pub async fn pg_reset_db(pg_client: &mut tokio_postgres::Client) -> Result<(), String> {
    pg_client
        .batch_execute(
            "
            DO $$ DECLARE
                r RECORD;
            BEGIN
                FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = current_schema()) LOOP
                    EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident(r.tablename) || ' CASCADE';
                END LOOP;
            END $$;
            DO $$ DECLARE
                r RECORD;
            BEGIN
                FOR r IN (SELECT typname FROM pg_type WHERE typtype = 'e' AND typnamespace = (SELECT oid FROM pg_namespace WHERE nspname = current_schema())) LOOP
                    EXECUTE 'DROP TYPE IF EXISTS ' || quote_ident(r.typname) || ' CASCADE';
                END LOOP;
            END $$;",
        )
        .await
        .map_err(|e| format!("unable to reset db: {e}"))?;
    Ok(())
}

pub(crate) fn chunk_insert_values_param_str(rows: usize, columns: usize) -> String {
    let mut arg_num = 1;
    let mut arg_str = String::new();
    for _ in 0..rows {
        arg_str.push('(');
        for i in 0..columns {
            arg_str.push_str(format!("${},", arg_num + i).as_str());
        }
        arg_str.pop();
        arg_str.push_str("),");
        arg_num += columns;
    }
    arg_str.pop();
    arg_str
}

// Tests share one physical database for both logical schemas, so they serialize on this lock:
// a concurrent migrate/reset from another test would tear the schema down mid-run.
#[cfg(test)]
lazy_static! {
    pub static ref PG_TEST_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

#[cfg(test)]
pub fn pg_test_config() -> config::PgDatabaseConfig {
    config::PgDatabaseConfig {
        dbname: "postgres".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        user: "postgres".to_string(),
        password: Some("postgres".to_string()),
        search_path: None,
        pool_max_size: None,
    }
}

#[cfg(test)]
pub fn pg_test_connection_pool() -> satstream_postgres::deadpool_postgres::Pool {
    satstream_postgres::pg_pool(&pg_test_config()).unwrap()
}

#[cfg(test)]
pub async fn pg_test_connection() -> tokio_postgres::Client {
    satstream_postgres::pg_connect(&pg_test_config()).await.unwrap()
}
