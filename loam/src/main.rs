use std::{env, process, str::FromStr};

use loam_config::{logging::LoggingConfig, storage_config};
use loam_world::ChunkManager;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use command::{CliError, Command};

pub mod command;

fn init_log(config: &LoggingConfig) {
    if !config.enabled {
        return;
    }

    let mut builder = ConfigBuilder::new();
    if !config.timestamp {
        builder.set_time_level(LevelFilter::Off);
    }
    if config.threads {
        builder.set_thread_level(LevelFilter::Info);
    } else {
        builder.set_thread_level(LevelFilter::Off);
    }

    let level = env::var("RUST_LOG")
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info);
    let color = if config.color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };

    if let Err(err) = TermLogger::init(level, builder.build(), TerminalMode::Mixed, color) {
        // Only possible when a logger is already installed, which then reports for us
        log::warn!("Failed to initialize the logger: {}", err);
    }
}

fn run() -> Result<(), CliError> {
    let config = storage_config();
    let command = Command::parse(env::args().skip(1))?;
    let manager = ChunkManager::from_config(config)?;
    log::debug!("Opened world at {:?}", config.world.folder);
    command.run(&manager)
}

fn main() {
    init_log(&storage_config().logging);

    if let Err(err) = run() {
        log::error!("{}", err);
        process::exit(1);
    }
}
