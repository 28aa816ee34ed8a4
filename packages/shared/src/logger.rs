//! Logging setup utilities for the LiveReload binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Library crates of this workspace whose logs are enabled by default.
const WORKSPACE_CRATES: &[&str] = &["lrserver", "lrserver_client", "tower_http"];

/// Build the default `EnvFilter` directive used when `RUST_LOG` is unset.
///
/// Binary names may contain dashes, tracing targets never do.
fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");

    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, default_log_level))
        .collect();
    if !WORKSPACE_CRATES.contains(&binary_target.as_str()) {
        directives.push(format!("{}={}", binary_target, default_log_level));
    }

    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "lrserver", "lrserver-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use lrserver_shared::logger::setup_logger;
///
/// setup_logger("lrserver", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_for_server_binary() {
        // テスト項目: サーバーバイナリ名がワークスペースのクレート名と重複しない
        // given (前提条件):
        let binary_name = "lrserver";

        // when (操作):
        let directive = default_directive(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            directive,
            "lrserver=debug,lrserver_client=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_default_directive_normalizes_dashes() {
        // テスト項目: ダッシュを含むバイナリ名はアンダースコアに変換される
        // given (前提条件):
        let binary_name = "lr-probe";

        // when (操作):
        let directive = default_directive(binary_name, "info");

        // then (期待する結果):
        assert!(directive.ends_with(",lr_probe=info"));
    }
}
