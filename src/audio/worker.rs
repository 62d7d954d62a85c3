// Playback worker
// One thread per Play/Resume, streaming the shared buffer from a start offset

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::output::{OutputBackend, StreamSpec};
use super::relay::PositionRelay;
use super::source::SampleBuffer;
use crate::error::DeviceError;

// Upper bound on how long the worker sleeps between stop-signal checks
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// What a single render call did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderStatus {
    /// A full buffer was copied; the position of its first frame, in seconds
    Playing(f64),
    /// The buffer ran out during this call; the remainder was zero-filled
    Exhausted,
    /// Called again after exhaustion; silence only
    Silent,
}

/// Frame cursor over a shared buffer, advanced by the audio callback
pub struct PlaybackCursor {
    buffer: Arc<SampleBuffer>,
    frame: usize,
    exhausted: bool,
}

impl PlaybackCursor {
    pub fn new(buffer: Arc<SampleBuffer>, start_frame: usize) -> Self {
        Self {
            buffer,
            frame: start_frame,
            exhausted: false,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Fill `out` (interleaved, same channel count as the buffer)
    pub fn render(&mut self, out: &mut [f32]) -> RenderStatus {
        if self.exhausted {
            out.fill(0.0);
            return RenderStatus::Silent;
        }

        let channels = self.buffer.channels();
        let requested = out.len() / channels;
        let remaining = self.buffer.frames().saturating_sub(self.frame);
        let chunk = remaining.min(requested);

        let start = self.frame.min(self.buffer.frames()) * channels;
        let copied = chunk * channels;
        out[..copied].copy_from_slice(&self.buffer.samples()[start..start + copied]);

        if chunk < requested {
            out[copied..].fill(0.0);
            self.frame += chunk;
            self.exhausted = true;
            return RenderStatus::Exhausted;
        }

        let position = self.buffer.time_of_frame(self.frame);
        self.frame += chunk;
        RenderStatus::Playing(position)
    }
}

/// Flags shared between one worker and its controller
#[derive(Debug, Default)]
pub struct WorkerSignals {
    stop: AtomicBool,
    exhausted: AtomicBool,
    failed: AtomicBool,
}

impl WorkerSignals {
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::Release);
        self.request_stop();
    }

    fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
        self.request_stop();
    }
}

/// Controller-side handle to a running worker
pub struct WorkerHandle {
    thread: JoinHandle<()>,
    signals: Arc<WorkerSignals>,
    start_frame: usize,
}

impl WorkerHandle {
    /// Start streaming `buffer` from `start_seconds`.
    ///
    /// Device errors never surface here; they end the worker, which the
    /// controller sees through [`is_alive`](Self::is_alive) and the signals.
    pub fn start(
        backend: Arc<dyn OutputBackend>,
        buffer: Arc<SampleBuffer>,
        relay: Arc<PositionRelay>,
        start_seconds: f64,
    ) -> std::io::Result<Self> {
        let start_frame = buffer.frame_at(start_seconds).min(buffer.frames());
        let signals = Arc::new(WorkerSignals::default());
        let worker_signals = Arc::clone(&signals);

        let thread = thread::Builder::new()
            .name("playback-worker".to_string())
            .spawn(move || run(backend, buffer, relay, worker_signals, start_frame))?;

        log::debug!("Playback worker started at frame {}", start_frame);

        Ok(Self {
            thread,
            signals,
            start_frame,
        })
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn signals(&self) -> &WorkerSignals {
        &self.signals
    }

    pub fn is_alive(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Raise the cooperative stop signal; the worker tears its stream down
    /// after the callback in flight, if any, completes
    pub fn request_stop(&self) {
        self.signals.request_stop();
        self.thread.thread().unpark();
    }

    /// Stop and wait for the worker thread to exit
    pub fn halt(self) {
        self.request_stop();
        if self.thread.join().is_err() {
            log::error!("Playback worker panicked");
        }
    }

    /// Join if the thread already exited, otherwise leave it running.
    /// Returns whether the worker had exited.
    pub fn release(self) -> bool {
        if self.thread.is_finished() {
            if self.thread.join().is_err() {
                log::error!("Playback worker panicked");
            }
            true
        } else {
            false
        }
    }
}

fn run(
    backend: Arc<dyn OutputBackend>,
    buffer: Arc<SampleBuffer>,
    relay: Arc<PositionRelay>,
    signals: Arc<WorkerSignals>,
    start_frame: usize,
) {
    let spec = StreamSpec {
        sample_rate: buffer.sample_rate(),
        channels: buffer.channels() as u16,
    };
    let mut cursor = PlaybackCursor::new(buffer, start_frame);
    let waiter = thread::current();

    let render_signals = Arc::clone(&signals);
    let render_waiter = waiter.clone();
    let render = Box::new(move |out: &mut [f32]| match cursor.render(out) {
        RenderStatus::Playing(position) => relay.publish(position),
        RenderStatus::Exhausted => {
            render_signals.mark_exhausted();
            render_waiter.unpark();
        }
        RenderStatus::Silent => {}
    });

    let error_signals = Arc::clone(&signals);
    let error_waiter = waiter;
    let on_error = Box::new(move |err: DeviceError| {
        log::error!("Audio output error: {}", err);
        error_signals.mark_failed();
        error_waiter.unpark();
    });

    let stream = match backend.open_stream(spec, render, on_error) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Could not start playback: {}", e);
            signals.mark_failed();
            return;
        }
    };

    while !signals.stop_requested() {
        thread::park_timeout(WAIT_SLICE);
    }

    drop(stream);
    log::debug!(
        "Playback worker finished (exhausted: {}, failed: {})",
        signals.exhausted(),
        signals.failed()
    );
}
