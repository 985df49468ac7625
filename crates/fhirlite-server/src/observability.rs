// Tracing initialization with a configurable and reloadable log level.
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Changes the active log filter after startup.
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: Option<reload::Handle<EnvFilter, Registry>>,
    env_override: bool,
}

impl LogLevelHandle {
    /// Apply a new logging level. `RUST_LOG`, when set, keeps precedence.
    pub fn apply(&self, level: &str) {
        if self.env_override {
            tracing::debug!(level, "RUST_LOG is set; ignoring configured level");
            return;
        }
        if let Some(handle) = &self.inner {
            if let Err(e) = handle.modify(|f| *f = EnvFilter::new(level)) {
                tracing::warn!(error = %e, "failed to apply log level");
            }
        }
    }
}

pub fn init_tracing() -> LogLevelHandle {
    init_tracing_with_level("info")
}

pub fn init_tracing_with_level(level: &str) -> LogLevelHandle {
    // Prefer RUST_LOG from env, otherwise use provided level string.
    let from_env = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok());
    let env_override = from_env.is_some();
    let base_filter = from_env.unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let installed = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init()
        .is_ok();

    LogLevelHandle {
        // A subscriber set elsewhere (tests) makes the handle inert.
        inner: installed.then_some(handle),
        env_override,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let first = init_tracing_with_level("warn");
        let second = init_tracing_with_level("debug");
        assert!(second.inner.is_none());
        first.apply("info");
        second.apply("info");
    }
}
