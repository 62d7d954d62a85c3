// Application state management
use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio::{ClockedOutput, CpalOutput, OutputBackend};
use crate::display::{DisplaySink, RenderLoop};
use crate::settings::AppSettings;
use crate::transport::TransportController;

pub struct AppState {
    pub controller: Arc<Mutex<TransportController>>,
    pub render: Mutex<RenderLoop>,
    pub display: Arc<dyn DisplaySink>,
    pub settings: AppSettings,
}

impl AppState {
    pub fn new(backend: Arc<dyn OutputBackend>, display: Arc<dyn DisplaySink>, settings: AppSettings) -> Self {
        Self {
            controller: Arc::new(Mutex::new(TransportController::new(backend))),
            render: Mutex::new(RenderLoop::new(settings.tick_interval())),
            display,
            settings,
        }
    }

    /// Build state with the output backend the settings ask for
    pub fn from_settings(display: Arc<dyn DisplaySink>, settings: AppSettings) -> Self {
        let backend: Arc<dyn OutputBackend> = if settings.output.null_output {
            Arc::new(ClockedOutput::default())
        } else {
            match &settings.output.device {
                Some(name) => Arc::new(CpalOutput::with_device(name.clone())),
                None => Arc::new(CpalOutput::new()),
            }
        };

        Self::new(backend, display, settings)
    }
}
