use serde::Deserialize;

use crate::error::HashError;

/// Reserved key carrying round-trip metadata, unless overridden.
pub const DEFAULT_METADATA_KEY: &str = "__hasherize_meta__";

/// Registry configuration, parsed from TOML.
///
/// ```toml
/// metadata_key = "__meta__"
/// max_depth = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashConfig {
    /// Key stripped by decode and handed to `from` transforms.
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,

    /// Maximum nesting of convertible objects in one encode/decode call.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_metadata_key() -> String {
    DEFAULT_METADATA_KEY.into()
}

fn default_max_depth() -> usize {
    64
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            metadata_key: default_metadata_key(),
            max_depth: default_max_depth(),
        }
    }
}

impl HashConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, HashError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HashError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, HashError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| HashError::Config(e.to_string()))?;
        if config.metadata_key.is_empty() {
            return Err(HashError::Config("metadata_key must not be empty".into()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = HashConfig::parse("").unwrap();
        assert_eq!(config, HashConfig::default());
        assert_eq!(config.metadata_key, "__hasherize_meta__");
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn parse_overrides() {
        let config = HashConfig::parse("metadata_key = \"__meta__\"\nmax_depth = 4\n").unwrap();
        assert_eq!(config.metadata_key, "__meta__");
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = HashConfig::parse("metadata = \"x\"").unwrap_err();
        assert!(matches!(err, HashError::Config(_)));
    }

    #[test]
    fn empty_metadata_key_is_rejected() {
        let err = HashConfig::parse("metadata_key = \"\"").unwrap_err();
        assert_eq!(err.to_string(), "config error: metadata_key must not be empty");
    }

    #[test]
    fn load_reads_file_and_adds_path_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth = 8").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = HashConfig::load(&path).unwrap();
        assert_eq!(config.max_depth, 8);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "max_depth = \"deep\"").unwrap();
        let bad_path = bad.path().to_str().unwrap().to_string();
        let err = HashConfig::load(&bad_path).unwrap_err();
        assert!(err.to_string().contains(&bad_path));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = HashConfig::load("/nonexistent/hasherize.toml").unwrap_err();
        assert!(matches!(err, HashError::Config(_)));
    }
}
