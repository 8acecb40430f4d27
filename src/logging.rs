//! Logger setup for the viewer
//!
//! The scene file's `log_filter` wins over `RUST_LOG`. Mesh draws log at
//! `debug` and frame timings at `trace`, so the default level keeps per-frame
//! output quiet.

use std::sync::Once;

use crate::config::SceneConfig;

/// Applied when neither the scene nor the environment names a filter
pub const DEFAULT_FILTER: &str = "info";

/// `env_filter` uses the `env_logger` syntax, e.g. "softpipe::world=debug".
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn from_scene(scene: &SceneConfig) -> Self {
        Self {
            env_filter: scene.log_filter.clone(),
            ..Default::default()
        }
    }

    /// Scene filter, then `env` (the value of `RUST_LOG`), then `DEFAULT_FILTER`.
    /// Blank filters count as unset.
    pub fn resolve_filter(&self, env: Option<String>) -> String {
        let set = |f: &String| !f.trim().is_empty();
        self.env_filter
            .clone()
            .filter(set)
            .or_else(|| env.filter(set))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

static INIT: Once = Once::new();

/// Install the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&filter)
            .write_style(config.write_style)
            .format_timestamp_millis();

        // A test harness may already own the logger
        if builder.try_init().is_ok() {
            log::debug!("logging initialized with filter '{}'", filter);
        }
    });
}
