//! Subscriber setup for `JSIL_LOG` / `JSIL_LOG_FORMAT`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Indented span tree, one subtree per translated method.
    Tree,
    Json,
}

impl LogFormat {
    /// Unrecognized values fall back to `Text`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Install a global stderr subscriber filtered by `JSIL_LOG`, or `RUST_LOG`
/// when that is unset. Without either variable nothing is installed. An
/// already installed subscriber is kept.
pub fn init_tracing() {
    let Some(directives) = ["JSIL_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|name| std::env::var(name).ok())
    else {
        return;
    };
    let filter = EnvFilter::builder().parse_lossy(directives);
    let format = LogFormat::parse(&std::env::var("JSIL_LOG_FORMAT").unwrap_or_default());

    let installed = match format {
        LogFormat::Tree => Registry::default()
            .with(filter)
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_indent_lines(true)
                    .with_targets(true),
            )
            .try_init()
            .is_ok(),
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };
    if !installed {
        tracing::debug!(?format, "init_tracing - subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }
}
