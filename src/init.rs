use crate::layer::ErrorCaptureLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::Registry;

/// Configuration of the global subscriber installed by [`init_tracing`].
///
/// **Fields**
/// - `capture_level`: least severe level that is copied into the current
///   request's log as a runtime error (`WARN` by default).
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   added as well and events are printed to the console.
/// - `install_panic_hook`: if `true`, panics inside a scoped request are
///   logged as `EXCEPTION` entries.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub capture_level: Level,
    pub enable_stdout: bool,
    pub install_panic_hook: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            capture_level: Level::WARN,
            enable_stdout: true,
            install_panic_hook: true,
        }
    }
}

/// Install the capture layer as the global `tracing` subscriber.
///
/// **Errors**
/// - [`TryInitError`] if a global subscriber was already set.
pub fn init_tracing_with_config(config: LayerConfig) -> Result<(), TryInitError> {
    let layer = ErrorCaptureLayer::new(config.capture_level);

    // The two subscriber shapes have different types, so build each one
    // separately.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        Registry::default().with(layer).with(fmt_layer).try_init()?;
    } else {
        Registry::default().with(layer).try_init()?;
    }

    if config.install_panic_hook {
        crate::hooks::install_panic_hook();
    }
    Ok(())
}

/// Initialize with [`LayerConfig::default`].
pub fn init_tracing() -> Result<(), TryInitError> {
    init_tracing_with_config(LayerConfig::default())
}
