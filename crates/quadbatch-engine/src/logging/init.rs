use std::sync::Once;

/// Crates whose per-call chatter drowns out frame-level diagnostics.
const NOISY_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

/// Logger configuration.
///
/// `env_filter` uses `env_logger` filter syntax, e.g.
/// `"info,quadbatch_engine=trace"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Caps `wgpu_core`, `wgpu_hal` and `naga` at `warn` unless the filter
    /// names them explicitly.
    pub quiet_gpu: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            quiet_gpu: true,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Info);

        if config.quiet_gpu {
            for krate in NOISY_CRATES {
                builder.filter_module(krate, log::LevelFilter::Warn);
            }
        }

        // Explicit filters come last so they override the defaults above.
        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        }

        builder.write_style(config.write_style);

        if let Err(err) = builder.try_init() {
            // Another logger owns the facade; report through it.
            log::warn!("env_logger not installed: {err}");
            return;
        }

        log::debug!("logging initialized");
    });
}
