//! Runtime configuration.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | QRSHEETS_MARKUP_TIMEOUT_MS | 10000 | Bound on one markup request |
//! | QRSHEETS_RENDER_TIMEOUT_MS | 30000 | Bound on one page rasterization |
//! | QRSHEETS_RENDER_CONCURRENCY | 1 | Pages of one sheet rendered at once |
//! | QRSHEETS_SYSTEM_FONTS | true | Load installed fonts for page text |
//! | QRSHEETS_FONT_DIR | (unset) | Extra font directory |

use crate::error::{SheetError, SheetResult};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub markup_timeout: Duration,
    pub render_timeout: Duration,
    /// Pages of one sheet rendered concurrently. Output order and numbering
    /// stay positional for any value.
    pub render_concurrency: usize,
    pub system_fonts: bool,
    pub font_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            markup_timeout: Duration::from_millis(10_000),
            render_timeout: Duration::from_millis(30_000),
            render_concurrency: 1,
            system_fonts: true,
            font_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from the environment, using defaults for unset
    /// or unparsable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            markup_timeout: env_parse("QRSHEETS_MARKUP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.markup_timeout),
            render_timeout: env_parse("QRSHEETS_RENDER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.render_timeout),
            render_concurrency: env_parse("QRSHEETS_RENDER_CONCURRENCY")
                .unwrap_or(defaults.render_concurrency),
            system_fonts: env_parse("QRSHEETS_SYSTEM_FONTS").unwrap_or(defaults.system_fonts),
            font_dir: std::env::var_os("QRSHEETS_FONT_DIR").map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> SheetResult<()> {
        if self.render_concurrency == 0 {
            return Err(SheetError::InvalidConfig(
                "render_concurrency must be > 0".to_string(),
            ));
        }
        if self.markup_timeout.is_zero() || self.render_timeout.is_zero() {
            return Err(SheetError::InvalidConfig(
                "timeouts must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render_concurrency, 1);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            render_concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SheetError::InvalidConfig(_))
        ));
    }
}
