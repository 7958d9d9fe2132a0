//! Logging initialization for the logfunnel CLI.
//!
//! Diagnostics always go to stderr. stdout carries only the rendered report,
//! so `logfunnel ship --output json | jq` keeps working.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logfunnel_core::config::GeneralConfig;

/// Targets that follow the configured level. Everything else (tokio,
/// dependencies) is held at `warn`.
const LOGFUNNEL_TARGETS: [&str; 3] = ["logfunnel", "logfunnel_core", "logfunnel_sink"];

/// Build the event filter.
///
/// Precedence: `RUST_LOG`, then `--log-level`, then `general.log_level`.
fn build_filter(config: &GeneralConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let level = level_override.unwrap_or(config.log_level.as_str());
    let directives: Vec<String> = std::iter::once("warn".to_owned())
        .chain(LOGFUNNEL_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect();
    EnvFilter::try_new(directives.join(","))
        .with_context(|| format!("invalid log level '{level}'"))
}

/// Initialize the global tracing subscriber.
///
/// # Formats
///
/// * `"json"` - one JSON object per line, for shipping the CLI's own logs
/// * `"pretty"` - multi-line human output
pub fn init_tracing(config: &GeneralConfig, level_override: Option<&str>) -> Result<()> {
    let filter = build_filter(config, level_override)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format.as_str() {
        "json" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        "pretty" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };

    result.context("failed to initialize tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general(level: &str, format: &str) -> GeneralConfig {
        GeneralConfig {
            log_level: level.to_owned(),
            log_format: format.to_owned(),
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = init_tracing(&general("info", "xml"), None).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_filter_uses_override_level() {
        // RUST_LOG takes precedence when set
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = build_filter(&general("info", "json"), Some("debug")).expect("valid");
        let rendered = filter.to_string();
        assert!(rendered.contains("logfunnel_sink=debug"), "{rendered}");
        assert!(rendered.contains("logfunnel=debug"), "{rendered}");
        assert!(!rendered.contains("info"), "{rendered}");
    }

    #[test]
    fn test_filter_defaults_to_config_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = build_filter(&general("warn", "pretty"), None).expect("valid");
        assert!(filter.to_string().contains("logfunnel_core=warn"));
    }

    #[test]
    fn test_filter_rejects_unknown_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = build_filter(&general("info", "json"), Some("loud")).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }
}
