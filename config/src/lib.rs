//! Loads [`EngineConfig`] from a TOML file, in the manner of the pack's
//! dedicated config-loading crates: read the file, parse with `toml` +
//! `serde`, run startup validation, and return a typed error rather than a
//! string on any failure.

use aggregator_types::{ConfigError, EngineConfig};
use std::path::Path;

/// Loads and validates the engine configuration from `path`. Any field the
/// file omits falls back to `EngineConfig`'s defaults; any field it doesn't
/// recognize is rejected by `deny_unknown_fields` (§9).
pub fn load(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    let config: EngineConfig = toml::from_str(&raw)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Parses configuration from an in-memory TOML string, for tests and for
/// embedding the engine without a filesystem config file.
pub fn parse(raw: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(raw)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse("tick_period_ms = 100\n").unwrap();
        assert_eq!(config.tick_period_ms, 100);
        assert_eq!(config.smoothing_factor, EngineConfig::default().smoothing_factor);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse("not_a_real_option = 1\n");
        assert!(err.is_err());
    }

    #[test]
    fn invalid_value_fails_validation() {
        let err = parse("smoothing_factor = 5.0\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load("/nonexistent/path/to/config.toml");
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }
}
