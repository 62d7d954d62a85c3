// Command handlers called by the GUI
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::audio;
use crate::error::LoadError;
use crate::state::AppState;
use crate::transport::{LoadedFile, MouseButton, TransportState};

/// Make sure the overlay gets redrawn for the state just set.
/// Scheduling problems are logged, never returned.
fn refresh(state: &AppState) {
    let result = state
        .render
        .lock()
        .ensure_running(Arc::clone(&state.controller), Arc::clone(&state.display));

    if let Err(e) = result {
        log::warn!("Could not schedule redraw: {}", e);
    }
}

/// Decode `path` and make it the current file.
/// The controller is only locked once decoding is done.
pub fn open_file(state: &AppState, path: &Path) -> Result<LoadedFile, LoadError> {
    let buffer = audio::load(path)?;
    let loaded = state.controller.lock().install(buffer, path);
    refresh(state);
    Ok(loaded)
}

pub fn play(state: &AppState) -> TransportState {
    let transport = state.controller.lock().play();
    refresh(state);
    transport
}

pub fn pause_toggle(state: &AppState) -> TransportState {
    let transport = state.controller.lock().pause_toggle();
    refresh(state);
    transport
}

pub fn stop(state: &AppState) -> TransportState {
    let transport = state.controller.lock().stop();
    refresh(state);
    transport
}

/// Click on the plot at `time` seconds. Returns whether it was accepted.
pub fn waveform_click(state: &AppState, time: f64, button: MouseButton) -> bool {
    let accepted = state.controller.lock().on_waveform_click(time, button);
    if accepted {
        refresh(state);
    }
    accepted
}

/// Shut playback down before the window goes away.
///
/// Raises the stop signal, cancels the render loop and waits the grace
/// period. A worker still running after that is left to finish on its own.
/// Returns false in that case.
pub fn close(state: &AppState) -> bool {
    let worker = state.controller.lock().begin_shutdown();

    if let Err(e) = state.render.lock().cancel() {
        log::warn!("{}. Quitting anyway.", e);
    }

    thread::sleep(state.settings.grace_period());

    let released = worker.map_or(true, |worker| worker.release());
    if !released {
        log::warn!("Playback worker still running at shutdown");
    }

    log::info!("App closed");
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::tests::write_wav;
    use crate::audio::ClockedOutput;
    use crate::display::render_loop::tests::RecordingSink;
    use crate::settings::AppSettings;
    use std::time::Duration;

    fn app(sink: Arc<RecordingSink>) -> AppState {
        AppState::new(Arc::new(ClockedOutput::new(441)), sink, AppSettings::default())
    }

    async fn settle(state: &AppState) {
        for _ in 0..200 {
            if !state.render.lock().is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("render loop never came to rest");
    }

    #[tokio::test]
    async fn test_open_file_draws_initial_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "tone.wav", 1, 44100, &vec![100; 44100 * 3]);
        let sink = Arc::new(RecordingSink::default());
        let state = app(sink.clone());

        let loaded = open_file(&state, &path).unwrap();
        assert_eq!(loaded.file_name, "tone.wav");
        assert!((loaded.duration - 3.0).abs() < 1e-9);
        settle(&state).await;

        let overlays = sink.overlays.lock();
        assert_eq!(overlays.last().unwrap().cursor, 0.0);
        assert_eq!(overlays.last().unwrap().marker, None);
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let sink = Arc::new(RecordingSink::default());
        let state = app(sink.clone());

        assert!(open_file(&state, Path::new("/no/such.wav")).is_err());
        assert_eq!(state.controller.lock().state(), TransportState::Idle);
        assert!(sink.overlays.lock().is_empty());
    }

    #[tokio::test]
    async fn test_marker_and_seek_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "three.wav", 1, 44100, &vec![0; 44100 * 3]);
        let sink = Arc::new(RecordingSink::default());
        let state = app(sink.clone());
        open_file(&state, &path).unwrap();

        assert!(waveform_click(&state, 1.2, MouseButton::Right));
        assert!(waveform_click(&state, 0.4, MouseButton::Left));
        assert!(!waveform_click(&state, 7.0, MouseButton::Left));
        settle(&state).await;

        let controller = state.controller.lock();
        assert_eq!(controller.marker_position(), Some(1.2));
        assert_eq!(controller.last_position(), 0.4);
        let last = *sink.overlays.lock().last().unwrap();
        assert_eq!(last.cursor, 0.4);
        assert_eq!(last.marker, Some(1.2));
    }

    #[tokio::test]
    async fn test_play_pause_stop_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "long.wav", 1, 44100, &vec![0; 44100 * 5]);
        let sink = Arc::new(RecordingSink::default());
        let state = app(sink.clone());
        open_file(&state, &path).unwrap();

        assert_eq!(play(&state), TransportState::Playing);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pause_toggle(&state), TransportState::Paused);
        settle(&state).await;

        let paused_at = state.controller.lock().last_position();
        assert!(paused_at > 0.0);
        assert_eq!(sink.overlays.lock().last().unwrap().cursor, paused_at);

        assert_eq!(pause_toggle(&state), TransportState::Playing);
        assert_eq!(stop(&state), TransportState::Stopped);
        assert_eq!(stop(&state), TransportState::Stopped);
        settle(&state).await;

        assert_eq!(sink.overlays.lock().last().unwrap().cursor, 0.0);
        assert!(close(&state));
    }

    #[tokio::test]
    async fn test_close_while_playing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "long.wav", 1, 44100, &vec![0; 44100 * 5]);
        let state = app(Arc::new(RecordingSink::default()));
        open_file(&state, &path).unwrap();
        assert_eq!(play(&state), TransportState::Playing);
        assert!(state.controller.lock().is_worker_running());

        assert!(close(&state));
        assert!(!state.render.lock().is_running());
    }

    #[test]
    fn test_failed_open_does_not_wait_for_controller() {
        let state = Arc::new(app(Arc::new(RecordingSink::default())));
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();

        let holder = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let _guard = state.controller.lock();
                locked_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(300));
            })
        };
        locked_rx.recv().unwrap();

        let started = std::time::Instant::now();
        assert!(open_file(&state, Path::new("/no/such.wav")).is_err());
        assert!(started.elapsed() < Duration::from_millis(200));
        holder.join().unwrap();
    }

    #[test]
    fn test_close_without_runtime_or_file() {
        let state = app(Arc::new(RecordingSink::default()));
        assert!(close(&state));
        assert_eq!(state.controller.lock().state(), TransportState::Idle);
    }
}
