//! beep - beep the PC speaker any number of ways.

mod cli;
mod config;
mod console;
mod drivers;
mod error;
mod evdev;
mod fallback;
mod player;
mod privilege;
mod sleep;
mod tone;

use cli::Args;
use config::ConfigManager;
use drivers::Registry;
use error::{BeepError, Result};
use fallback::fallback_beep;
use player::Player;
use sleep::SignalSleeper;
use std::io;
use std::process::ExitCode;

fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn main() -> ExitCode {
    let args = match Args::parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(BeepError::Cli(e)) => e.exit(),
        Err(e) => {
            env_logger::init();
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(args.verbosity)),
    )
    .format_timestamp(None)
    .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            if matches!(e, BeepError::Privileged(_)) {
                log::error!("{}", privilege::HINT);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    privilege::check()?;

    let config_manager = ConfigManager::new();
    let config = config_manager.load();
    if let Some(path) = config_manager.path() {
        log::debug!("config file: {}", path.display());
    }
    let options = args.resolve(&config);

    let registry = Registry::with_defaults();
    let driver = match registry.detect(options.device.as_deref()) {
        Ok(driver) => driver,
        Err(BeepError::NoDevice) => {
            // Output the only beep we can.
            fallback_beep();
            return Err(BeepError::NoDevice);
        }
        Err(e) => return Err(e),
    };

    log::info!(
        "using driver {} on {}",
        driver.name(),
        driver.device_path().display()
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    Player::new(driver, SignalSleeper::new()).play_chain(
        options.chain,
        &mut stdin.lock(),
        &mut stdout.lock(),
    )
}
