// Audio module
// Symphonia for decoding, cpal for output, one worker thread per playback run

pub mod decoder;
pub mod output;
pub mod relay;
pub mod source;
pub mod worker;

pub use output::{ClockedOutput, CpalOutput, OutputBackend};
pub use relay::PositionRelay;
pub use source::{load, SampleBuffer};
pub use worker::WorkerHandle;
