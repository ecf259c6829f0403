// Pronunciation-matching engine for speech-driven language drills

// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod clock;
pub mod config;
pub mod driver;
pub mod events;
pub mod matching;
pub mod progression;
pub mod recognition;
pub mod replay;
pub mod session;
pub mod speech;
pub mod timer;

use env_logger::Env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use config::EngineConfig;
pub use session::{CommandError, PracticeSession, SessionCommand};

/// Replay sidecar entry point
///
/// Logs go to stderr; stdout carries the JSON-lines protocol. The optional
/// first argument is a config path, otherwise the default location is used.
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => match EngineConfig::default_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("{}, using defaults", e);
                return serve(EngineConfig::default());
            }
        },
    };

    match EngineConfig::load(&config_path) {
        Ok(config) => serve(config),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn serve(config: EngineConfig) -> ExitCode {
    let mut replay = replay::Replay::new(config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    match replay.run(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
