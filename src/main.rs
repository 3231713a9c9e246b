//! nuitrack-bridge - drives a body-tracking engine at a fixed rate and
//! republishes its color, depth, user and skeleton output as robotics
//! messages on six topics.

mod config;
mod engine;
mod error;
mod messages;
mod monitor;
mod pipeline;
mod publisher;
mod types;

use std::{
    env,
    path::PathBuf,
    sync::atomic::Ordering,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};

use crate::{
    config::{BridgeConfig, EngineBackend},
    engine::TrackingEngine,
    pipeline::{Bridge, start_update_loop},
    publisher::{ChannelPublisher, channel_publisher},
};

const STOP_POLL: Duration = Duration::from_millis(50);

/// Config path from `-c <path>`, `--config <path>` or a first positional
/// argument. Without one the built-in defaults are used.
fn parse_config_path() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(PathBuf::from(&args[1]));
    }

    None
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => BridgeConfig::load(&path)?,
        None => BridgeConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("nuitrack-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    let (publisher, subscribers) = channel_publisher();
    let monitor = monitor::start_monitor(subscribers, config.topics.clone());

    let result = match config.engine.backend {
        #[cfg(feature = "engine-sim")]
        EngineBackend::Sim => {
            let engine = engine::sim::SimEngine::new(config.engine.sim.clone());
            run_bridge(engine, publisher, &config)
        }
        #[cfg(not(feature = "engine-sim"))]
        EngineBackend::Sim => {
            drop(publisher);
            Err(anyhow::anyhow!(
                "engine backend \"sim\" requires the engine-sim feature"
            ))
        }
    };

    if monitor.join().is_err() {
        log::warn!("topic monitor panicked");
    }
    result
}

fn run_bridge<E: TrackingEngine>(
    engine: E,
    publisher: ChannelPublisher,
    config: &BridgeConfig,
) -> Result<()> {
    log::info!(
        "using {} engine at {} Hz",
        engine.label(),
        config.update.rate_hz
    );

    let bridge = Bridge::new(engine, publisher, config.tick_period());
    let update_loop = start_update_loop(bridge).context("tracking session failed to start")?;

    let stop = update_loop.stop_flag();
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let stop = update_loop.stop_flag();
    while !stop.load(Ordering::SeqCst) && !update_loop.is_finished() {
        thread::sleep(STOP_POLL);
    }

    if let Err(err) = update_loop.stop() {
        if let Some(kind) = err.fault_kind() {
            log::error!("{kind:?} engine fault ended the session");
        }
        return Err(err).context("tracking session aborted");
    }
    log::info!("tracking session released, exiting");
    Ok(())
}
