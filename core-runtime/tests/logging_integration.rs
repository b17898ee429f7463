//! Integration tests for logging system

use bridge_traits::log::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_ansi(false);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(!config.ansi);
    assert!(config.logger_sink.is_none());
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_init_logging_only_once() {
    // Integration tests run in their own process, so the first init owns the
    // global subscriber.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug);
    assert!(init_logging(config.clone()).is_ok());

    tracing::info!(target: "core_sync", job_id = "42", "logging initialized");

    let second = init_logging(config);
    assert!(second.is_err());
}

#[test]
fn test_invalid_filter_is_reported() {
    let config = LoggingConfig::default().with_filter("core_mapping=loud");
    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Invalid log filter"));
}
