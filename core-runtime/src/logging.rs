//! # Logging
//!
//! Installs the global `tracing` subscriber for a job worker.
//!
//! Three layers are stacked on the registry:
//! - a fmt layer writing Pretty, Json or Compact lines to stdout
//! - a [`HostSinkLayer`] mirroring events into a host [`LoggerSink`], when one
//!   is configured
//! - an `EnvFilter` applied to both
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(LoggingConfig::default().with_format(LogFormat::Json))?;
//! tracing::info!(target: "core_sync", "worker started");
//! ```

use crate::error::{Error, Result};

use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates covered by the default filter
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_mapping",
    "core_sync",
    "bridge_desktop",
];

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One JSON object per event, fields flattened
    Json,
    /// One short line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level of the workspace crates when no custom filter is set
    pub level: LogLevel,
    /// `EnvFilter` directives replacing the default filter
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit (Pretty) or span context (Json)
    pub enable_spans: bool,
    pub display_target: bool,
    /// ANSI colors; off for container log collectors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            ansi: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns `Error::Config` when the filter does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(HostSinkLayer::new(config.logger_sink.clone()))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_ansi(config.ansi);

    match config.format {
        LogFormat::Pretty => {
            let span_events = if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            };
            layer.pretty().with_span_events(span_events).boxed()
        }
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            // everything else stays at warn
            let level = directive(config.level);
            std::iter::once("warn".to_string())
                .chain(WORKSPACE_TARGETS.iter().map(|t| format!("{}={}", t, level)))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Mirrors events into a host [`LoggerSink`]
///
/// Delivery is spawned on the current tokio runtime when there is one and
/// blocks the emitting thread otherwise.
pub struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl HostSinkLayer {
    pub fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = EntryFields::default();
        event.record(&mut fields);

        let message = fields.message.take().unwrap_or_else(|| metadata.name().to_string());
        let mut entry = fields
            .pairs
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (k, v)| {
                entry.with_field(k, v)
            });
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }

        deliver(Arc::clone(sink), entry);
    }
}

fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    let send = async move {
        if let Err(err) = sink.log(entry).await {
            eprintln!("LoggerSink error: {}", err);
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(send);
        }
        Err(_) => futures::executor::block_on(send),
    }
}

/// Event fields rendered as strings
#[derive(Default)]
struct EntryFields {
    message: Option<String>,
    pairs: Vec<(String, String)>,
}

impl EntryFields {
    fn push(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => self.pairs.push((name.to_string(), value)),
        }
    }
}

impl Visit for EntryFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}
