// Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a file into a [`SampleBuffer`](crate::audio::SampleBuffer)
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to probe file format: {0}")]
    Probe(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Failed to create decoder: {0}")]
    Decoder(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("File does not declare a sample rate")]
    MissingSampleRate,

    #[error("File decoded to zero frames")]
    Empty,
}

/// Errors raised by the audio output device.
///
/// These never leave the playback worker: they are logged there and the
/// worker finishes.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No output device available")]
    NoDevice,

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get output config: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build output stream: {0}")]
    Build(String),

    #[error("Failed to start stream: {0}")]
    Play(String),

    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// Errors raised while arming or cancelling the render loop
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("No async runtime available to schedule the render loop")]
    NoRuntime,

    #[error("Render loop is not scheduled")]
    NotScheduled,
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
