// Logging for Cadre
//
// Library code only emits `tracing` events and spans; nothing is printed
// unless the application installs a subscriber. This module offers a few
// ready-made subscriber setups plus macros for the runtime's own events.
//
// # Usage Examples
//
// ```rust
// use cadre::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or pick the level and format yourself
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     json_format: false,
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// Worker threads run inside a `pool` span carrying the pool label and worker
// id, so `RUST_LOG=cadre=debug` shows every worker start, decline and exit
// attributed to its pool.

use std::io;
use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the subscriber installed by [`init`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id; worker threads are named after their pool
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(filters) = &config.target_filters {
        for directive in filters.split(',') {
            if let Ok(directive) = directive.trim().parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Installs the global subscriber. Only the first call in a process takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        let fmt_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        if config.json_format {
            set_global_subscriber(registry.with(fmt::layer().json().flatten_event(true)));
        } else if config.show_time {
            set_global_subscriber(registry.with(fmt_layer));
        } else {
            set_global_subscriber(registry.with(fmt_layer.without_time()));
        }
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` for appending, creating it if needed.
pub fn file_writer(path: &str) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Installs a subscriber writing to both the console and `log_file`.
///
/// The file is opened up front so a bad path is reported to the caller.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    let file = file_writer(log_file)?;
    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });
    Ok(())
}

/// INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG for the runtime, TRACE for pool internals (queueing, declines).
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("cadre=debug,cadre::pool=trace".to_string()),
        ..Default::default()
    });
}

/// JSON lines without file/line information, for log aggregators.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// WARN and above only, compact, for test binaries.
///
/// ```rust
/// #[test]
/// fn my_test() {
///     cadre::logging::init_test();
///     // ...
/// }
/// ```
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

/// Span wrapping everything a pool worker does.
///
/// ```rust
/// let span = cadre::pool_span!("io", worker = "3f2a9c1e");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! pool_span {
    ($pool:expr) => {
        $crate::__private::tracing::info_span!("pool", pool = $pool)
    };
    ($pool:expr, $($fields:tt)*) => {
        $crate::__private::tracing::info_span!("pool", pool = $pool, $($fields)*)
    };
}

/// Worker lifecycle events: started, added, declined, retired.
#[macro_export]
macro_rules! log_worker {
    ($pool:expr, $worker:expr, $event:expr) => {
        $crate::__private::tracing::debug!(pool = $pool, worker = %$worker, event = $event);
    };
    ($pool:expr, $worker:expr, $event:expr, $($fields:tt)*) => {
        $crate::__private::tracing::debug!(pool = $pool, worker = %$worker, event = $event, $($fields)*);
    };
}

/// Supervisor scaling decisions.
#[macro_export]
macro_rules! log_scaling {
    ($pool:expr, $action:expr) => {
        $crate::__private::tracing::info!(pool = $pool, action = $action);
    };
    ($pool:expr, $action:expr, $($fields:tt)*) => {
        $crate::__private::tracing::info!(pool = $pool, action = $action, $($fields)*);
    };
}

// Re-export the most commonly used tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_console_info() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
        assert!(config.target_filters.is_none());
    }

    #[test]
    fn target_filters_are_parsed() {
        let config = LogConfig {
            target_filters: Some("cadre=trace, cadre::supervisor=debug".to_string()),
            ..Default::default()
        };
        let filter = env_filter(&config).to_string();
        assert!(filter.contains("cadre=trace"));
        assert!(filter.contains("cadre::supervisor=debug"));
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_test();
        init_test();
        init_default();
    }
}
