// Audio output backends
// cpal for real devices, plus a clocked silent device for headless runs

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::DeviceError;

/// Fills one device buffer of interleaved f32 samples
pub type RenderFn = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Called when the device reports a failure mid-stream
pub type ErrorFn = Box<dyn FnMut(DeviceError) + Send + 'static>;

/// Shape of the stream a worker asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A running output stream. Dropping it stops the callbacks.
pub trait OutputStream {}

impl OutputStream for Stream {}

/// Something that can open an output stream driven by a render callback.
///
/// Streams are opened and dropped on the playback worker's thread.
pub trait OutputBackend: Send + Sync {
    fn open_stream(
        &self,
        spec: StreamSpec,
        render: RenderFn,
        on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, DeviceError>;
}

/// Output through cpal's default host
pub struct CpalOutput {
    device_name: Option<String>,
}

impl CpalOutput {
    /// Use the default output device
    pub fn new() -> Self {
        Self { device_name: None }
    }

    /// Use the output device with this name
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn device(&self) -> Result<cpal::Device, DeviceError> {
        let host = cpal::default_host();

        match &self.device_name {
            None => host.default_output_device().ok_or(DeviceError::NoDevice),
            Some(wanted) => host
                .output_devices()
                .map_err(|e| DeviceError::Config(e.to_string()))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or_else(|| DeviceError::DeviceNotFound(wanted.clone())),
        }
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut render: RenderFn,
        mut on_error: ErrorFn,
    ) -> Result<Stream, DeviceError> {
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if scratch.len() != data.len() {
                        scratch.resize(data.len(), 0.0);
                    }
                    render(&mut scratch);
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                move |err| on_error(DeviceError::Stream(err.to_string())),
                None,
            )
            .map_err(|e| DeviceError::Build(e.to_string()))
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBackend for CpalOutput {
    fn open_stream(
        &self,
        spec: StreamSpec,
        render: RenderFn,
        on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, DeviceError> {
        let device = self.device()?;

        let default_config = device
            .default_output_config()
            .map_err(|e| DeviceError::Config(e.to_string()))?;

        // The stream runs at the file's own rate and channel count
        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        log::debug!(
            "Opening output stream on {}: {} channel(s), {} Hz, {:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.channels,
            spec.sample_rate,
            default_config.sample_format()
        );

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, render, on_error)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, render, on_error)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, render, on_error)?
            }
            format => return Err(DeviceError::UnsupportedFormat(format!("{:?}", format))),
        };

        stream.play().map_err(|e| DeviceError::Play(e.to_string()))?;

        Ok(Box::new(stream))
    }
}

/// A silent device that pulls fixed-size buffers on its own clock.
///
/// Each callback asks for `chunk_frames` frames and the next one follows
/// `chunk_frames / sample_rate` seconds later, divided by `speed`.
#[derive(Debug, Clone, Copy)]
pub struct ClockedOutput {
    chunk_frames: usize,
    speed: f64,
}

impl ClockedOutput {
    pub const DEFAULT_CHUNK_FRAMES: usize = 512;

    pub fn new(chunk_frames: usize) -> Self {
        Self {
            chunk_frames: chunk_frames.max(1),
            speed: 1.0,
        }
    }

    /// Run the clock faster (> 1.0) or slower than real time
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed > 0.0 {
            self.speed = speed;
        }
        self
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }
}

impl Default for ClockedOutput {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_FRAMES)
    }
}

impl OutputBackend for ClockedOutput {
    fn open_stream(
        &self,
        spec: StreamSpec,
        mut render: RenderFn,
        _on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, DeviceError> {
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(DeviceError::Config(format!("unusable stream shape {:?}", spec)));
        }

        let period = Duration::from_secs_f64(
            self.chunk_frames as f64 / spec.sample_rate as f64 / self.speed,
        );
        let len = self.chunk_frames * spec.channels as usize;
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let clock = thread::Builder::new()
            .name("clocked-output".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; len];
                while running_clone.load(Ordering::Acquire) {
                    render(&mut buffer);
                    thread::sleep(period);
                }
            })
            .map_err(|e| DeviceError::Build(e.to_string()))?;

        Ok(Box::new(ClockedStream {
            running,
            clock: Some(clock),
        }))
    }
}

struct ClockedStream {
    running: Arc<AtomicBool>,
    clock: Option<JoinHandle<()>>,
}

impl OutputStream for ClockedStream {}

impl Drop for ClockedStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(clock) = self.clock.take() {
            let _ = clock.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_clocked_output_calls_render_with_full_chunks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let backend = ClockedOutput::new(64).with_speed(50.0);

        let stream = backend
            .open_stream(
                StreamSpec { sample_rate: 8000, channels: 2 },
                Box::new(move |out| {
                    assert_eq!(out.len(), 128);
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                }),
                Box::new(|_| {}),
            )
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        drop(stream);
        let after_drop = calls.load(Ordering::SeqCst);
        assert!(after_drop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_clocked_output_rejects_empty_shape() {
        let backend = ClockedOutput::default();
        let result = backend.open_stream(
            StreamSpec { sample_rate: 0, channels: 1 },
            Box::new(|_| {}),
            Box::new(|_| {}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_speed_must_be_positive() {
        let backend = ClockedOutput::new(0).with_speed(-2.0);
        assert_eq!(backend.chunk_frames(), 1);
        assert_eq!(backend.speed, 1.0);
    }
}
