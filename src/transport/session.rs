// Per-file session state and the transport state enum

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::SampleBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No file loaded yet
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Mouse button of a click on the plotted waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Moves the playback start position
    Left,
    /// Moves the marker
    Right,
}

/// Summary of a successfully opened file
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
}

/// State of the currently loaded file. Positions are in seconds.
#[derive(Debug)]
pub struct PlaybackSession {
    buffer: Arc<SampleBuffer>,
    source: PathBuf,
    /// Where the cursor is drawn
    pub current_position: f64,
    /// Where the next Play or Resume starts
    pub last_position: f64,
    pub marker_position: Option<f64>,
}

impl PlaybackSession {
    pub fn new(buffer: Arc<SampleBuffer>, source: impl Into<PathBuf>) -> Self {
        Self {
            buffer,
            source: source.into(),
            current_position: 0.0,
            last_position: 0.0,
            marker_position: None,
        }
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    /// Put both positions back at the start of the file
    pub fn rewind(&mut self) {
        self.current_position = 0.0;
        self.last_position = 0.0;
    }

    pub fn info(&self) -> LoadedFile {
        LoadedFile {
            path: self.source.clone(),
            file_name: self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            duration: self.buffer.duration(),
            sample_rate: self.buffer.sample_rate(),
            channels: self.buffer.channels(),
            frames: self.buffer.frames(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_at_zero_without_marker() {
        let buffer = SampleBuffer::from_interleaved(vec![0.0; 200], 2, 50).unwrap();
        let session = PlaybackSession::new(Arc::new(buffer), "/music/take 3.wav");

        assert_eq!(session.current_position, 0.0);
        assert_eq!(session.last_position, 0.0);
        assert_eq!(session.marker_position, None);

        let info = session.info();
        assert_eq!(info.file_name, "take 3.wav");
        assert_eq!(info.frames, 100);
        assert_eq!(info.channels, 2);
        assert!((info.duration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rewind_keeps_marker() {
        let buffer = SampleBuffer::from_interleaved(vec![0.0; 100], 1, 10).unwrap();
        let mut session = PlaybackSession::new(Arc::new(buffer), "a.wav");
        session.current_position = 3.0;
        session.last_position = 2.5;
        session.marker_position = Some(1.0);

        session.rewind();
        assert_eq!(session.current_position, 0.0);
        assert_eq!(session.last_position, 0.0);
        assert_eq!(session.marker_position, Some(1.0));
    }
}
