//! Run configuration
//!
//! Defaults match the MAUDE export layout. A YAML file passed with
//! `--config` can override any field:
//!
//! ```yaml
//! sheet: Events
//! marker: MAUDE
//! affirmative_fill: "90EE90"
//! negative_fill: "FFB6C1"
//! categories:
//!   - name: Device Problems
//!     pattern: Device Problem
//!     prefix: Device
//! ```

use crate::error::{MaudeError, MaudeResult};
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SHEET: &str = "Events";
pub const DEFAULT_MARKER: &str = "MAUDE";
pub const DEFAULT_AFFIRMATIVE_FILL: &str = "90EE90";
pub const DEFAULT_NEGATIVE_FILL: &str = "FFB6C1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worksheet holding the event rows
    pub sheet: String,
    /// Case-insensitive file name marker used by auto-discovery
    pub marker: String,
    /// Fill for indicator cells equal to 1 (RRGGBB)
    pub affirmative_fill: String,
    /// Fill for indicator cells equal to 0 (RRGGBB)
    pub negative_fill: String,
    pub categories: Vec<Category>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            marker: DEFAULT_MARKER.to_string(),
            affirmative_fill: DEFAULT_AFFIRMATIVE_FILL.to_string(),
            negative_fill: DEFAULT_NEGATIVE_FILL.to_string(),
            categories: Category::defaults(),
        }
    }
}

impl Config {
    /// Load a YAML config file; missing fields keep their defaults
    pub fn load(path: &Path) -> MaudeResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MaudeResult<()> {
        if self.sheet.trim().is_empty() {
            return Err(MaudeError::Config("sheet name must not be empty".into()));
        }
        if self.categories.is_empty() {
            return Err(MaudeError::Config(
                "at least one category is required".into(),
            ));
        }
        for category in &self.categories {
            if category.pattern.is_empty() || category.prefix.is_empty() {
                return Err(MaudeError::Config(format!(
                    "category '{}' needs a non-empty pattern and prefix",
                    category.name
                )));
            }
        }
        parse_rgb(&self.affirmative_fill)?;
        parse_rgb(&self.negative_fill)?;
        Ok(())
    }

    pub fn affirmative_rgb(&self) -> MaudeResult<u32> {
        parse_rgb(&self.affirmative_fill)
    }

    pub fn negative_rgb(&self) -> MaudeResult<u32> {
        parse_rgb(&self.negative_fill)
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.pattern.as_str()).collect()
    }
}

/// Parse `RRGGBB` (optionally prefixed with `#`) into a packed RGB value
pub fn parse_rgb(hex: &str) -> MaudeResult<u32> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return Err(MaudeError::Config(format!(
            "color '{hex}' must have 6 hex digits"
        )));
    }
    u32::from_str_radix(digits, 16)
        .map_err(|_| MaudeError::Config(format!("color '{hex}' is not valid hex")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sheet, "Events");
        assert_eq!(config.patterns(), vec!["Device Problem", "Patient Problem", "Patient Outcome"]);
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("90EE90").unwrap(), 0x90EE90);
        assert_eq!(parse_rgb("#FFB6C1").unwrap(), 0xFFB6C1);
        assert!(parse_rgb("FFF").is_err());
        assert!(parse_rgb("GGGGGG").is_err());
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sheet: Reports\nnegative_fill: \"#FF0000\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sheet, "Reports");
        assert_eq!(config.negative_rgb().unwrap(), 0xFF0000);
        assert_eq!(config.affirmative_fill, DEFAULT_AFFIRMATIVE_FILL);
        assert_eq!(config.categories.len(), 3);
    }

    #[test]
    fn test_load_rejects_empty_prefix() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "categories:\n  - name: Device\n    pattern: Device Problem\n    prefix: \"\""
        )
        .unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, MaudeError::Config(_)));
    }
}
