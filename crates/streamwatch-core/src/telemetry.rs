//! Tracing initialisation for the `streamwatch` binary.
//!
//! Log lines go to stderr; stdout belongs to the result sink. Without
//! `RUST_LOG`, streamwatch's own crates log at the requested level while
//! dependencies (the PostgreSQL driver in particular) are held at `warn`.
//! JSON lines carry the enclosing run span, so every event of a cycle can be
//! grouped by `run_id`.
//!
//! Subsequent calls are silently ignored (the global subscriber can only be
//! set once per process).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level.
const OWN_TARGETS: &[&str] = &["streamwatch", "streamwatch_core", "streamwatch_inventory"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        OWN_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines.
/// * `level`: verbosity of streamwatch's own events when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_dependencies() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("streamwatch_core=debug"));
        assert!(directives.contains("streamwatch_inventory=debug"));
        assert!(directives.contains("streamwatch=debug"));
    }

    #[test]
    fn test_default_directives_parse_as_filter() {
        for level in [Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
