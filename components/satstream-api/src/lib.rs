#[macro_use]
extern crate rocket;

#[macro_use]
extern crate hiro_system_kit;

#[macro_use]
extern crate serde_derive;

pub mod db;
pub mod query;
pub mod responses;
pub mod routes;

use std::net::{IpAddr, Ipv4Addr};

use ::config::Config as IndexerConfig;
use rocket::config::{self, Config, LogLevel};
use rocket::{Ignite, Rocket, Shutdown};
use satstream::satstream_postgres::deadpool_postgres::Pool;
use satstream::satstream_postgres::pg_pool;
use satstream::try_error;
use satstream::utils::Context;

pub struct ApiState {
    pub ordinals_pool: Pool,
    pub brc20_pool: Option<Pool>,
    pub server_version: String,
    pub ctx: Context,
}

/// Launches the read API server on its own thread and returns a handle that can shut it down.
pub async fn start_api_server(
    config: &IndexerConfig,
    ctx: &Context,
) -> Result<Shutdown, String> {
    let ignite = build_server(config, ctx).await?;
    let shutdown = ignite.shutdown();
    let moved_ctx = ctx.clone();
    let _ = hiro_system_kit::thread_named("HTTP Ordinals API").spawn(move || {
        if let Err(e) = hiro_system_kit::nestable_block_on(ignite.launch()) {
            try_error!(moved_ctx, "API server terminated: {e}");
        }
    });
    Ok(shutdown)
}

pub async fn build_server(
    config: &IndexerConfig,
    ctx: &Context,
) -> Result<Rocket<Ignite>, String> {
    let Some(api_config) = &config.api else {
        return Err("Config entry for `api` not found".to_string());
    };
    let Some(ordinals) = &config.ordinals else {
        return Err("Config entry for `ordinals` not found".to_string());
    };
    let state = ApiState {
        ordinals_pool: pg_pool(&ordinals.db)?,
        brc20_pool: match config.ordinals_brc20_config() {
            Some(brc20) => Some(pg_pool(&brc20.db)?),
            None => None,
        },
        server_version: api_config
            .server_version
            .clone()
            .unwrap_or(format!("satstream-api v{}", env!("CARGO_PKG_VERSION"))),
        ctx: ctx.clone(),
    };

    let mut shutdown_config = config::Shutdown::default();
    shutdown_config.ctrlc = false;
    shutdown_config.grace = 1;
    shutdown_config.mercy = 1;
    let control_config = Config {
        port: api_config.http_port,
        workers: 4,
        address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
        keep_alive: 5,
        temp_dir: std::env::temp_dir().into(),
        log_level: LogLevel::Off,
        cli_colors: false,
        shutdown: shutdown_config,
        ..Config::default()
    };
    let routes = routes![
        routes::handle_status,
        routes::inscriptions::handle_inscriptions_index,
        routes::inscriptions::handle_inscription_show,
        routes::inscriptions::handle_inscription_content,
        routes::inscriptions::handle_inscription_transfers,
        routes::inscriptions::handle_transfers_per_block,
        routes::sats::handle_sat_show,
        routes::sats::handle_sat_inscriptions,
        routes::stats::handle_stats_inscriptions,
        routes::brc20::handle_tokens_index,
        routes::brc20::handle_token_show,
        routes::brc20::handle_token_holders,
        routes::brc20::handle_activity,
        routes::brc20::handle_balances,
    ];

    rocket::custom(control_config)
        .manage(state)
        .mount("/ordinals", routes)
        .ignite()
        .await
        .map_err(|e| format!("unable to build ordinals API server: {e}"))
}
