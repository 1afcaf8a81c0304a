//! wayfarer - deterministic top-down world simulation
//!
//! Headless executable: runs the simulation at a fixed step with optional
//! scripted input and background exploration persistence.

use anyhow::Result;
use std::{env, path::PathBuf};
use tracing::info;
use wayfarer::config;
use wayfarer::headless::{self, HeadlessConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting wayfarer v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    if cli.help {
        print_usage();
        return Ok(());
    }

    let mut sim = match cli.config.as_deref() {
        Some(path) => config::load_from_path(path),
        None => config::load(),
    };
    if let Some(seed) = cli.world_seed {
        sim.world.seed = seed;
    }
    if let Some(distance) = cli.render_distance {
        sim.world.render_distance = distance.clamp(1, 16);
    }

    if let Some(path) = cli.dump_config.as_deref() {
        config::save_to_path(&sim, path)?;
        info!(path = %path.display(), "Wrote effective config");
        return Ok(());
    }

    if cli.exit_when_script_finished && cli.scripted_input.is_none() {
        tracing::error!("--exit-when-script-finished has no effect without --script");
    }

    let summary = headless::run(HeadlessConfig {
        sim,
        player_name: cli.player_name,
        formless: cli.formless,
        scripted_input: cli.scripted_input,
        store: cli.store,
        net_log: cli.net_log,
        net_replay: cli.net_replay,
        max_ticks: cli.max_ticks,
        exit_when_script_finished: cli.exit_when_script_finished,
        realtime: cli.realtime,
    })
    .await?;

    println!(
        "ticks={} explored={} resident={} enemies_defeated={} player_alive={} sent={} synced={}",
        summary.ticks,
        summary.explored,
        summary.resident,
        summary.enemies_defeated,
        summary.player_alive,
        summary.messages_sent,
        summary.sync.stored,
    );
    info!("wayfarer shutting down");
    Ok(())
}

fn print_usage() {
    println!(
        "usage: wayfarer [--config PATH] [--ticks N] [--seed N] [--store PATH] [--script PATH]\n\
         \x20               [--exit-when-script-finished] [--net-log PATH] [--net-replay PATH]\n\
         \x20               [--render-distance N] [--name NAME] [--formless] [--realtime]\n\
         \x20               [--dump-config PATH]"
    );
}

#[derive(Clone)]
struct CliOptions {
    help: bool,
    config: Option<PathBuf>,
    max_ticks: Option<u64>,
    world_seed: Option<u64>,
    store: Option<PathBuf>,
    scripted_input: Option<PathBuf>,
    exit_when_script_finished: bool,
    net_log: Option<PathBuf>,
    net_replay: Option<PathBuf>,
    render_distance: Option<i32>,
    player_name: String,
    formless: bool,
    realtime: bool,
    dump_config: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            help: false,
            config: None,
            max_ticks: None,
            world_seed: None,
            store: None,
            scripted_input: None,
            exit_when_script_finished: false,
            net_log: None,
            net_replay: None,
            render_distance: None,
            player_name: "Wayfarer".to_string(),
            formless: false,
            realtime: false,
            dump_config: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => opts.help = true,
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_ticks = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--ticks must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--ticks requires an integer");
                    }
                }
                "--seed" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.world_seed = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--seed must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--seed requires an integer");
                    }
                }
                "--store" => {
                    if let Some(path) = args.next() {
                        opts.store = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--store requires a file path");
                    }
                }
                "--script" => {
                    if let Some(path) = args.next() {
                        opts.scripted_input = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--script requires a file path");
                    }
                }
                "--exit-when-script-finished" => opts.exit_when_script_finished = true,
                "--net-log" => {
                    if let Some(path) = args.next() {
                        opts.net_log = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--net-log requires a file path");
                    }
                }
                "--net-replay" => {
                    if let Some(path) = args.next() {
                        opts.net_replay = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--net-replay requires a file path");
                    }
                }
                "--render-distance" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<i32>() {
                            Ok(value) => opts.render_distance = Some(value),
                            Err(err) => {
                                tracing::error!(
                                    %err,
                                    value = %raw,
                                    "--render-distance must be an integer"
                                );
                            }
                        }
                    } else {
                        tracing::error!("--render-distance requires an integer");
                    }
                }
                "--name" => {
                    if let Some(name) = args.next() {
                        opts.player_name = name;
                    } else {
                        tracing::error!("--name requires a value");
                    }
                }
                "--formless" => opts.formless = true,
                "--realtime" => opts.realtime = true,
                "--dump-config" => {
                    if let Some(path) = args.next() {
                        opts.dump_config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--dump-config requires a file path");
                    }
                }
                other => {
                    tracing::warn!(arg = %other, "Ignoring unknown argument");
                }
            }
        }

        opts
    }
}
