// Transport controller
// Owns the session positions and the playback worker, and turns user
// commands and worker notifications into state transitions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::session::{LoadedFile, MouseButton, PlaybackSession, TransportState};
use crate::audio::{self, OutputBackend, PositionRelay, SampleBuffer, WorkerHandle};
use crate::display::{Controls, Overlay};
use crate::error::LoadError;

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub overlay: Option<Overlay>,
    pub controls: Controls,
    /// Whether the render loop should schedule another tick
    pub reschedule: bool,
}

pub struct TransportController {
    backend: Arc<dyn OutputBackend>,
    relay: Arc<PositionRelay>,
    session: Option<PlaybackSession>,
    state: TransportState,
    worker: Option<WorkerHandle>,
}

impl TransportController {
    pub fn new(backend: Arc<dyn OutputBackend>) -> Self {
        Self {
            backend,
            relay: Arc::new(PositionRelay::new()),
            session: None,
            state: TransportState::Idle,
            worker: None,
        }
    }

    /// Decode `path` and make it the current session.
    ///
    /// On failure the previous session, if any, is left untouched.
    pub fn open_file(&mut self, path: &Path) -> Result<LoadedFile, LoadError> {
        let buffer = audio::load(path)?;
        Ok(self.install(buffer, path))
    }

    /// Replace the session with an already decoded buffer
    pub fn install(&mut self, buffer: SampleBuffer, source: impl Into<PathBuf>) -> LoadedFile {
        // Never let two workers share the device
        self.halt_worker();
        self.relay.clear();

        let session = PlaybackSession::new(Arc::new(buffer), source);
        let info = session.info();
        self.session = Some(session);
        self.set_state(TransportState::Stopped);

        info
    }

    /// Start playback from the last position (Stopped or Paused)
    pub fn play(&mut self) -> TransportState {
        match self.state {
            TransportState::Idle => log::debug!("Play ignored: no file loaded"),
            TransportState::Playing => {}
            TransportState::Stopped | TransportState::Paused => self.spawn_worker(),
        }
        self.state
    }

    /// Pause while playing, resume while paused
    pub fn pause_toggle(&mut self) -> TransportState {
        match self.state {
            TransportState::Playing => self.pause(),
            TransportState::Paused => self.spawn_worker(),
            TransportState::Idle | TransportState::Stopped => {}
        }
        self.state
    }

    /// Stop playback and rewind. Calling it again changes nothing.
    pub fn stop(&mut self) -> TransportState {
        if self.state == TransportState::Idle {
            return self.state;
        }

        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
        self.relay.clear();
        if let Some(session) = self.session.as_mut() {
            session.rewind();
        }
        self.set_state(TransportState::Stopped);

        self.state
    }

    /// Handle a click on the plot at `time` seconds.
    ///
    /// Left moves the start position and halts playback into Paused; right
    /// moves the marker and leaves playback alone. Returns false when the
    /// click was ignored (nothing loaded, or outside the plotted range).
    pub fn on_waveform_click(&mut self, time: f64, button: MouseButton) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.buffer().contains_time(time) {
            log::debug!("Ignoring click at {:.3} s outside the plot", time);
            return false;
        }

        match button {
            MouseButton::Right => {
                session.marker_position = Some(time);
            }
            MouseButton::Left => {
                session.last_position = time;
                session.current_position = time;
                if let Some(worker) = &self.worker {
                    worker.request_stop();
                }
                self.set_state(TransportState::Paused);
            }
        }

        true
    }

    /// Advance the display by one tick
    pub fn tick(&mut self) -> Tick {
        let state = self.state;
        let reschedule = match state {
            TransportState::Idle => false,
            TransportState::Playing if self.worker_finished() => {
                self.finish_playback();
                false
            }
            TransportState::Playing => {
                if let Some(session) = self.session.as_mut() {
                    let position = self.relay.take().unwrap_or(session.last_position);
                    session.current_position = position;
                    session.last_position = position;
                }
                true
            }
            // Frozen where it was paused
            TransportState::Paused => false,
            TransportState::Stopped => {
                if let Some(session) = self.session.as_mut() {
                    session.rewind();
                }
                false
            }
        };

        Tick {
            overlay: self.overlay(),
            controls: self.controls(),
            reschedule,
        }
    }

    /// Raise the stop signal and hand the worker over for a bounded wait
    pub fn begin_shutdown(&mut self) -> Option<WorkerHandle> {
        let worker = self.worker.take()?;
        worker.request_stop();
        Some(worker)
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn current_position(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.current_position)
    }

    pub fn last_position(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.last_position)
    }

    pub fn marker_position(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.marker_position)
    }

    pub fn duration(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.duration())
    }

    pub fn is_worker_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_alive())
    }

    /// Frame the most recent worker started from
    pub fn worker_start_frame(&self) -> Option<usize> {
        self.worker.as_ref().map(|w| w.start_frame())
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.session.as_ref().map(|s| Overlay {
            cursor: s.current_position,
            marker: s.marker_position,
        })
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(self.state)
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let position = self
            .relay
            .take()
            .unwrap_or(session.current_position)
            .clamp(0.0, session.duration());
        session.current_position = position;
        session.last_position = position;

        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
        self.set_state(TransportState::Paused);
    }

    fn spawn_worker(&mut self) {
        // A worker retired by pause/stop/click may still be winding down
        self.halt_worker();
        self.relay.clear();

        let Some(session) = self.session.as_mut() else {
            return;
        };

        let start = session.last_position;
        match WorkerHandle::start(
            Arc::clone(&self.backend),
            Arc::clone(session.buffer()),
            Arc::clone(&self.relay),
            start,
        ) {
            Ok(worker) => {
                session.current_position = start;
                self.worker = Some(worker);
                self.set_state(TransportState::Playing);
            }
            Err(e) => log::error!("Failed to spawn playback worker: {}", e),
        }
    }

    /// Whether the worker ended on its own. A worker that died without
    /// raising its stop signal gets it raised here.
    fn worker_finished(&self) -> bool {
        match &self.worker {
            None => true,
            Some(worker) => {
                if !worker.is_alive() && !worker.signals().stop_requested() {
                    log::warn!("Playback worker exited unexpectedly");
                    worker.request_stop();
                }
                worker.signals().stop_requested()
            }
        }
    }

    fn finish_playback(&mut self) {
        if let Some(worker) = &self.worker {
            let signals = worker.signals();
            if signals.failed() {
                log::warn!("Playback ended by an output device error");
            } else if signals.exhausted() {
                log::info!("Playback reached the end of the file");
            }
        }

        self.relay.clear();
        if let Some(session) = self.session.as_mut() {
            session.rewind();
        }
        self.set_state(TransportState::Stopped);
    }

    fn halt_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.halt();
        }
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            log::debug!("Transport {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
    }
}
