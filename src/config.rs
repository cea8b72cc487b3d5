//! Configuration: compile options and the optional `ksql.toml` file.
//!
//! ```toml
//! [compiler]
//! pluralize = true
//! decimal_separator = "."
//!
//! [decoder]
//! format = "query-stream"
//! ```

use crate::decoder::ResponseFormat;
use crate::error::{KsqlError, KsqlResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "ksql.toml";

/// Options read (never mutated) by every compile call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Pluralize source and entity names derived from type names.
    pub pluralize: bool,
    /// Decimal separator for floating-point and decimal literals.
    pub decimal_separator: char,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pluralize: true,
            decimal_separator: '.',
        }
    }
}

impl CompileOptions {
    pub fn without_pluralization(mut self) -> Self {
        self.pluralize = false;
        self
    }

    pub fn decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = separator;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KsqlConfig {
    pub compiler: CompileOptions,
    pub decoder: DecoderConfig,
}

impl KsqlConfig {
    /// Load `ksql.toml` from the working directory, else from the user
    /// config directory. No file means defaults.
    pub fn load() -> KsqlResult<Self> {
        match Self::locate() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> KsqlResult<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading ksql config");
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> KsqlResult<Self> {
        toml::from_str(content).map_err(|e| KsqlError::Config(e.to_string()))
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("ksql").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert!(options.pluralize);
        assert_eq!(options.decimal_separator, '.');
    }

    #[test]
    fn test_partial_file() {
        let config = KsqlConfig::from_toml_str(
            r#"
            [compiler]
            decimal_separator = ","
            "#,
        )
        .unwrap();
        assert!(config.compiler.pluralize);
        assert_eq!(config.compiler.decimal_separator, ',');
        assert_eq!(config.decoder.format, ResponseFormat::QueryStream);
    }

    #[test]
    fn test_decoder_format() {
        let config = KsqlConfig::from_toml_str("[decoder]\nformat = \"query\"\n").unwrap();
        assert_eq!(config.decoder.format, ResponseFormat::Query);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let err = KsqlConfig::from_toml_str("[compiler]\npluralize = 3\n").unwrap_err();
        assert!(matches!(err, KsqlError::Config(_)));
    }
}
