//! Tracing spans and events, plus subscriber setup for the `matte-refine` binary
//!
//! The library only emits events and spans; installing a subscriber is left
//! to applications. `TracingConfig` (feature `cli`) is what the binary uses.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output for CI environments
    Compact,
    /// JSON structured logging for production environments
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Configuration for tracing output destination
#[cfg(feature = "cli")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stdout/stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
}

/// Keeps the non-blocking file writer flushing until the process exits
#[cfg(feature = "tracing-files")]
static FILE_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[cfg(feature = "tracing-files")]
fn file_writer(path: &std::path::Path) -> tracing_appender::non_blocking::NonBlocking {
    let appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        path.file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("matte-refine.log")),
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    writer
}

/// Tracing configuration builder
#[cfg(feature = "cli")]
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Output destination
    pub output: TracingOutput,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

#[cfg(feature = "cli")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            session_id: None,
        }
    }
}

#[cfg(feature = "cli")]
impl TracingConfig {
    /// Create a new tracing configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-3+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set output format
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set output destination
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Set session ID for request correlation
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug", // -v: per-stage timings
            _ => "trace", // -vv and above
        }
    }

    /// Initialize tracing subscriber based on configuration
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        // RUST_LOG wins over the verbosity flags
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        // Create base subscriber
        let registry = Registry::default().with(filter);

        match (&self.format, &self.output) {
            // Console output with pretty formatting
            (TracingFormat::Console, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_level(true)
                    .compact();

                registry.with(fmt_layer).init();
            },

            // Compact console output
            (TracingFormat::Compact, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact();

                registry.with(fmt_layer).init();
            },

            #[cfg(feature = "tracing-json")]
            // JSON output for structured logging
            (TracingFormat::Json, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).init();
            },

            #[cfg(all(feature = "tracing-files", feature = "tracing-json"))]
            (TracingFormat::Json, TracingOutput::File(path)) => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_writer(file_writer(path))
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).init();
            },

            #[cfg(feature = "tracing-files")]
            (_, TracingOutput::File(path)) => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_writer(path))
                    .compact();

                registry.with(fmt_layer).init();
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "matte refinement session started");
        }

        Ok(())
    }
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span for the whole CLI invocation
    pub fn session(session_id: &str, worker_name: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            worker = %worker_name
        )
    }

    /// Span for one refinement job
    pub fn job(input: &std::path::Path, dimensions: (u32, u32), ssaa_factor: u32) -> Span {
        tracing::span!(
            Level::INFO,
            "job",
            input = %input.display(),
            width = %dimensions.0,
            height = %dimensions.1,
            ssaa_factor = %ssaa_factor
        )
    }

    /// Span for a single pipeline stage
    pub fn stage(stage: &str, dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::DEBUG,
            "stage",
            stage = %stage,
            width = %dimensions.0,
            height = %dimensions.1
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error};

    /// Log an error with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(
            error = %error,
            context = %context,
            "operation failed"
        );
    }

    /// Log how long an operation took
    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(
            operation = %operation,
            duration_ms = %duration_ms,
            "performance metric"
        );
    }
}
