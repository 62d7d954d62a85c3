// Transport: session state and the controller that drives playback

mod controller;
mod session;

pub use controller::{Tick, TransportController};
pub use session::{LoadedFile, MouseButton, PlaybackSession, TransportState};
