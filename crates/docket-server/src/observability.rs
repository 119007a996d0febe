// Tracing initialization with a reloadable level and output format.
use std::sync::OnceLock;

use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*, reload};

use crate::config::{LogFormat, LoggingConfig};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type FmtLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();
static FMT_RELOAD_HANDLE: OnceLock<reload::Handle<FmtLayer, FilteredRegistry>> = OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter(level));
    let _ = LOG_RELOAD_HANDLE.set(filter_handle);

    let (fmt_layer, fmt_handle) = reload::Layer::new(fmt_layer(LogFormat::Text));
    let _ = FMT_RELOAD_HANDLE.set(fmt_handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

// RUST_LOG wins over the configured level.
fn base_filter(level: &str) -> EnvFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn fmt_layer(format: LogFormat) -> FmtLayer {
    match format {
        LogFormat::Text => fmt::layer().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    }
}

/// Apply a new logging level at runtime if reload handle is configured.
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|f| {
            *f = base_filter(level);
        });
    }
}

/// Apply the loaded logging section: level and output format.
pub fn apply_logging_config(logging: &LoggingConfig) {
    apply_logging_level(&logging.level);
    if logging.format != LogFormat::Text {
        if let Some(handle) = FMT_RELOAD_HANDLE.get() {
            let _ = handle.reload(fmt_layer(logging.format));
        }
    }
}
