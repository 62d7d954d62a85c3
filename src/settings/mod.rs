// Settings module

mod settings;

pub use settings::{AppSettings, BrowseSettings, OutputSettings, RenderSettings, ShutdownSettings};
