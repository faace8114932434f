//! Configuration management for the comment engine

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::html::HighlightConfig;
use crate::resolve::{OffsetResolver, DEFAULT_MAX_ROW_DEPTH};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub driver: DriverConfig,
    pub resolver: ResolverConfig,
    pub highlight: HighlightSettings,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverConfig {
    /// Log file painted into the render tree
    pub log_file: Option<PathBuf>,
    /// JSON script replayed against the store
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    pub max_row_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightSettings {
    pub class_prefix: String,
    pub inline_styles: bool,
    pub default_color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Bound of the session actor's command channel
    pub queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            driver: DriverConfig::default(),
            resolver: ResolverConfig {
                max_row_depth: DEFAULT_MAX_ROW_DEPTH,
            },
            highlight: HighlightSettings {
                class_prefix: "lv-comment".to_string(),
                inline_styles: true,
                default_color: None,
            },
            logging: LoggingConfig {
                filter: "logview_comments=info".to_string(),
            },
            session: SessionConfig { queue: 64 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Self::from_lookup(|name| env::var(name))
    }

    /// Build a config from any variable source shaped like `env::var`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, env::VarError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |name: &str| match lookup(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e),
        };
        let defaults = Config::default();

        Ok(Config {
            driver: DriverConfig {
                log_file: var("LOGVIEW_LOG_FILE")?.map(PathBuf::from),
                script: var("LOGVIEW_SCRIPT")?.map(PathBuf::from),
            },
            resolver: ResolverConfig {
                max_row_depth: parse_or(
                    "LOGVIEW_MAX_ROW_DEPTH",
                    var("LOGVIEW_MAX_ROW_DEPTH")?,
                    defaults.resolver.max_row_depth,
                ),
            },
            highlight: HighlightSettings {
                class_prefix: var("LOGVIEW_HIGHLIGHT_CLASS")?
                    .unwrap_or(defaults.highlight.class_prefix),
                inline_styles: parse_or(
                    "LOGVIEW_INLINE_STYLES",
                    var("LOGVIEW_INLINE_STYLES")?,
                    defaults.highlight.inline_styles,
                ),
                default_color: var("LOGVIEW_DEFAULT_COLOR")?.filter(|c| !c.trim().is_empty()),
            },
            logging: LoggingConfig {
                filter: var("LOGVIEW_LOG")?.unwrap_or(defaults.logging.filter),
            },
            session: SessionConfig {
                queue: parse_or(
                    "LOGVIEW_SESSION_QUEUE",
                    var("LOGVIEW_SESSION_QUEUE")?,
                    defaults.session.queue,
                )
                .max(1),
            },
        })
    }

    pub fn highlight_config(&self) -> HighlightConfig {
        HighlightConfig {
            class_prefix: self.highlight.class_prefix.clone(),
            include_inline_styles: self.highlight.inline_styles,
            ..HighlightConfig::default()
        }
    }

    pub fn offset_resolver(&self) -> OffsetResolver {
        OffsetResolver::new(self.resolver.max_row_depth)
    }
}

/// Parse `value`, warning and falling back to `default` when it is malformed
fn parse_or<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
{
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!(
                variable = name,
                value = %raw,
                fallback = ?default,
                "Invalid configuration value, using default"
            );
            default
        }
    }
}
