// Audio source: a whole file decoded into memory

use std::path::Path;

use super::decoder::AudioDecoder;
use crate::error::LoadError;

/// Decoded audio held in memory.
///
/// Samples are stored interleaved, `frames * channels` long, so frame `i`
/// is the slice `samples[i * channels..(i + 1) * channels]`. Mono input is
/// a single column. Nothing mutates a buffer once it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from interleaved samples.
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(
        mut samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, LoadError> {
        if sample_rate == 0 {
            return Err(LoadError::MissingSampleRate);
        }
        if channels == 0 {
            return Err(LoadError::Empty);
        }

        samples.truncate(samples.len() - samples.len() % channels);
        if samples.is_empty() {
            return Err(LoadError::Empty);
        }

        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Time of the first and last plotted frame, in seconds
    pub fn time_range(&self) -> (f64, f64) {
        (0.0, self.time_of_frame(self.frames() - 1))
    }

    pub fn time_of_frame(&self, frame: usize) -> f64 {
        frame as f64 / self.sample_rate as f64
    }

    /// Frame index for a position in seconds, rounded to the nearest frame
    pub fn frame_at(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).round() as usize
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }

    /// Samples of a single channel, in frame order
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        let take = if channel < self.channels { self.frames() } else { 0 };
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .take(take)
            .copied()
    }

    /// Whether a time lies on the plotted axis, `[0, duration)`
    pub fn contains_time(&self, seconds: f64) -> bool {
        seconds >= 0.0 && seconds < self.duration()
    }
}

/// Decode a whole file into memory
pub fn load(path: &Path) -> Result<SampleBuffer, LoadError> {
    let mut decoder = AudioDecoder::open(path)?;
    let sample_rate = decoder.sample_rate();
    let mut channels = decoder.channels();
    let mut samples = Vec::new();

    while let Some(chunk) = decoder.decode_next()? {
        if chunk.samples.is_empty() {
            continue;
        }
        match channels {
            Some(expected) if expected != chunk.channels => {
                return Err(LoadError::Decode(format!(
                    "channel count changed from {} to {}",
                    expected, chunk.channels
                )));
            }
            Some(_) => {}
            None => channels = Some(chunk.channels),
        }
        samples.extend_from_slice(&chunk.samples);
    }

    let buffer = SampleBuffer::from_interleaved(samples, channels.unwrap_or(0), sample_rate)?;
    log::info!(
        "Loaded {:?}: {} frames, {} channel(s), {} Hz ({:.3} s)",
        path,
        buffer.frames(),
        buffer.channels(),
        buffer.sample_rate(),
        buffer.duration()
    );

    Ok(buffer)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn write_wav(dir: &Path, name: &str, channels: u16, sample_rate: u32, samples: &[i16]) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_load_mono_is_single_column() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = (0..4410).map(|i| (i % 100) as i16 * 100).collect();
        let path = write_wav(dir.path(), "mono.wav", 1, 44100, &samples);

        let buffer = load(&path).unwrap();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.frames(), 4410);
        assert!((buffer.duration() - 0.1).abs() < 1e-9);
        assert_eq!(buffer.frame(1).unwrap().len(), 1);
        assert!((buffer.frame(1).unwrap()[0] - 100.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_stereo_keeps_frames_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let samples = [1000i16, -1000, 2000, -2000, 3000, -3000];
        let path = write_wav(dir.path(), "stereo.wav", 2, 8000, &samples);

        let buffer = load(&path).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 3);
        let left: Vec<f32> = buffer.channel(0).collect();
        let right: Vec<f32> = buffer.channel(1).collect();
        assert!(left.iter().all(|s| *s > 0.0));
        assert!(right.iter().all(|s| *s < 0.0));
    }

    #[test]
    fn test_load_all_zero_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "silence.wav", 1, 44100, &vec![0; 88200]);

        let buffer = load(&path).unwrap();
        assert!((buffer.duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "empty.wav", 1, 44100, &[]);

        assert!(load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = load(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"this is not a wave file at all").unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn test_from_interleaved_rejects_zero_rate() {
        let err = SampleBuffer::from_interleaved(vec![0.0; 4], 1, 0).unwrap_err();
        assert!(matches!(err, LoadError::MissingSampleRate));
    }

    #[test]
    fn test_contains_time_is_half_open() {
        let buffer = SampleBuffer::from_interleaved(vec![0.0; 100], 1, 100).unwrap();
        assert!(buffer.contains_time(0.0));
        assert!(buffer.contains_time(0.99));
        assert!(!buffer.contains_time(1.0));
        assert!(!buffer.contains_time(-0.01));
        assert_eq!(buffer.time_range(), (0.0, 0.99));
    }
}
