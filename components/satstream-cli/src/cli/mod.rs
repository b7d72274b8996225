mod commands;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process;
use std::thread::sleep;
use std::time::Duration;

use clap::Parser;
use commands::{ConfigCommand, DatabaseCommand, IndexCommand, Opts, ServiceCommand};
use config::generator::generate_toml_config;
use config::Config;
use crossbeam_channel::Sender;
use satstream::db::{migrate_dbs, reset_dbs};
use satstream::service::Service;
use satstream::try_info;
use satstream::try_warn;
use satstream::utils::Context;
use satstream_types::BlockEvent;

pub fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context {
        logger: Some(logger),
        tracer: false,
    };

    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = hiro_system_kit::nestable_block_on(handle_command(opts, &ctx)) {
        error!(ctx.expect_logger(), "{e}");
        std::thread::sleep(std::time::Duration::from_millis(500));
        process::exit(1);
    }
}

fn check_maintenance_mode(ctx: &Context) {
    let maintenance_enabled = std::env::var("SATSTREAM_MAINTENANCE").unwrap_or("0".into());
    if maintenance_enabled.eq("1") {
        try_info!(
            ctx,
            "Entering maintenance mode. Unset SATSTREAM_MAINTENANCE and reboot to resume operations"
        );
        sleep(Duration::from_secs(u64::MAX))
    }
}

fn confirm_reset() -> Result<(), String> {
    println!("All indexed data and schema objects will be dropped. Confirm? [Y/n]");
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).unwrap();
    if buffer.starts_with('n') {
        return Err("Reset aborted".to_string());
    }
    Ok(())
}

fn confirm_rollback(current_chain_tip: u64, blocks_to_rollback: u32) -> Result<(), String> {
    println!("Index chain tip is at #{current_chain_tip}");
    println!(
        "{} blocks will be dropped. New index chain tip will be at #{}. Confirm? [Y/n]",
        blocks_to_rollback,
        current_chain_tip - blocks_to_rollback as u64
    );
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).unwrap();
    if buffer.starts_with('n') {
        return Err("Deletion aborted".to_string());
    }
    Ok(())
}

/// Forwards newline-delimited JSON block events from a reader into the ingest channel. The
/// channel closes when the reader ends or a malformed event is found, which shuts the service
/// down at the next block boundary.
fn start_event_reader<R: BufRead + Send + 'static>(
    reader: R,
    event_tx: Sender<BlockEvent>,
    ctx: &Context,
) {
    let moved_ctx = ctx.clone();
    let _ = hiro_system_kit::thread_named("Block event reader").spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    try_warn!(moved_ctx, "Unable to read block event: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let event: BlockEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    try_warn!(moved_ctx, "Malformed block event, stopping ingestion: {e}");
                    break;
                }
            };
            if event_tx.send(event).is_err() {
                break;
            }
        }
    });
}

async fn handle_command(opts: Opts, ctx: &Context) -> Result<(), String> {
    match opts {
        Opts::Service(subcmd) => match subcmd {
            ServiceCommand::Start(cmd) => {
                check_maintenance_mode(ctx);
                let config = Config::from_file_path(&cmd.config_path)?;
                config.assert_ordinals_config()?;
                migrate_dbs(&config, ctx).await?;

                let mut service = Service::new(&config, ctx)?;
                let _api_shutdown = match &config.api {
                    Some(api) if api.enabled => {
                        try_info!(ctx, "Starting ordinals API on port {}", api.http_port);
                        Some(satstream_api::start_api_server(&config, ctx).await?)
                    }
                    _ => None,
                };

                let (event_tx, event_rx) = crossbeam_channel::unbounded();
                start_event_reader(BufReader::new(std::io::stdin()), event_tx, ctx);
                if let Err(e) = service.run(event_rx).await {
                    error!(ctx.expect_logger(), "{e}");
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    process::exit(e.exit_code());
                }
                Ok(())
            }
        },
        Opts::Index(subcmd) => match subcmd {
            IndexCommand::Ingest(cmd) => {
                let config = Config::from_file_path(&cmd.config_path)?;
                config.assert_ordinals_config()?;
                migrate_dbs(&config, ctx).await?;

                let file = File::open(&cmd.events_path)
                    .map_err(|e| format!("unable to open {}: {e}", cmd.events_path))?;
                let mut service = Service::new(&config, ctx)?;
                let (event_tx, event_rx) = crossbeam_channel::unbounded();
                start_event_reader(BufReader::new(file), event_tx, ctx);
                if let Err(e) = service.run(event_rx).await {
                    error!(ctx.expect_logger(), "{e}");
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    process::exit(e.exit_code());
                }
                Ok(())
            }
            IndexCommand::Rollback(cmd) => {
                let config = Config::from_file_path(&cmd.config_path)?;
                config.assert_ordinals_config()?;

                let mut service = Service::new(&config, ctx)?;
                let Some((chain_tip, _)) = service.get_index_chain_tip().await? else {
                    return Err("Index is empty, nothing to rollback".to_string());
                };
                confirm_rollback(chain_tip, cmd.blocks)?;

                let block_heights: Vec<u64> =
                    ((chain_tip - cmd.blocks as u64 + 1)..=chain_tip).collect();
                service.rollback(&block_heights).await?;
                println!("{} blocks dropped", cmd.blocks);
                Ok(())
            }
        },
        Opts::Database(subcmd) => match subcmd {
            DatabaseCommand::Migrate(cmd) => {
                let config = Config::from_file_path(&cmd.config_path)?;
                config.assert_ordinals_config()?;
                migrate_dbs(&config, ctx).await?;
                Ok(())
            }
            DatabaseCommand::Reset(cmd) => {
                let config = Config::from_file_path(&cmd.config_path)?;
                config.assert_ordinals_config()?;
                confirm_reset()?;
                reset_dbs(&config, ctx).await?;
                Ok(())
            }
        },
        Opts::Config(subcmd) => match subcmd {
            ConfigCommand::New(cmd) => {
                use std::io::Write;
                let network = if cmd.regtest {
                    "devnet"
                } else if cmd.testnet {
                    "testnet"
                } else {
                    "mainnet"
                };
                let config_content = generate_toml_config(network);
                let mut file_path = PathBuf::new();
                file_path.push("Satstream.toml");
                let mut file = File::create(&file_path)
                    .map_err(|e| format!("unable to open file {}\n{}", file_path.display(), e))?;
                file.write_all(config_content.as_bytes())
                    .map_err(|e| format!("unable to write file {}\n{}", file_path.display(), e))?;
                println!("Created file Satstream.toml");
                Ok(())
            }
        },
    }
}
