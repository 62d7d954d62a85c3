// audioplot - waveform inspector and replayer
// Module declarations
pub mod audio;
pub mod commands;
pub mod display;
pub mod error;
pub mod settings;
pub mod state;
pub mod transport;

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use display::ConsoleDisplay;
use settings::AppSettings;
use state::AppState;
use transport::TransportState;

pub use error::{DeviceError, LoadError, SchedulingError, SettingsError};

const USAGE: &str = "usage: audioplot <FILE> [--settings <PATH>] [--null-output]";

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    file: PathBuf,
    settings: Option<PathBuf>,
    null_output: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut file = None;
    let mut parsed = Args::default();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--null-output" => parsed.null_output = true,
            "--settings" => {
                let path = args.next().context("--settings needs a path")?;
                parsed.settings = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown flag {}\n{}", flag, USAGE),
            _ if file.is_some() => bail!("only one file can be opened\n{}", USAGE),
            _ => file = Some(PathBuf::from(arg)),
        }
    }

    parsed.file = file.context(USAGE)?;
    Ok(parsed)
}

/// Load the file, play it once with the console display, and shut down
/// cleanly when it ends or on ctrl-c.
pub fn run() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for transport transitions
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let mut settings = match &args.settings {
        Some(path) => AppSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => AppSettings::default(),
    };
    if args.null_output {
        settings.output.null_output = true;
    }

    let file = if args.file.is_relative() {
        settings.browse_directory().join(&args.file)
    } else {
        args.file
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let app = AppState::from_settings(Arc::new(ConsoleDisplay::new()), settings);

    let result = runtime.block_on(play_to_end(&app, file));

    commands::close(&app);
    println!();

    result
}

async fn play_to_end(app: &AppState, file: PathBuf) -> anyhow::Result<()> {
    let loaded = commands::open_file(app, &file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    log::info!("{}: {:.3} sec.", loaded.file_name, loaded.duration);

    if commands::play(app) != TransportState::Playing {
        bail!("Playback did not start");
    }

    let mut poll = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                commands::stop(app);
                return Ok(());
            }
            _ = poll.tick() => {
                if app.controller.lock().state() == TransportState::Stopped {
                    return Ok(());
                }
            }
        }
    }
}
