//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Main configuration for itrack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Order timing configuration.
    pub eta: EtaConfig,
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Lines scanned below a bare label when looking for its value.
    pub max_line_distance: usize,

    /// Keyword groups a line must hit to count as the item table header.
    pub header_keyword_threshold: usize,

    /// Line-item descriptions are cut to this many characters.
    pub max_description_len: usize,

    /// Decimal places kept for rates derived as value / quantity.
    pub rate_scale: u32,

    /// Customer-name candidates longer than this are discarded.
    pub max_name_len: usize,

    /// Lines gathered for a multi-line address block.
    pub address_max_lines: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_line_distance: 10,
            header_keyword_threshold: 3,
            max_description_len: 255,
            rate_scale: 2,
            max_name_len: 200,
            address_max_lines: 4,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum trimmed text length to treat a PDF as having text.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self { min_text_length: 1 }
    }
}

/// Order timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaConfig {
    /// Estimate used when an order has no timed services.
    pub default_minutes: u32,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self { default_minutes: 30 }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.header_keyword_threshold == 0 {
            return Err(TrackerError::Config(
                "extraction.header_keyword_threshold must be at least 1".to_string(),
            ));
        }
        if self.extraction.max_description_len == 0 {
            return Err(TrackerError::Config(
                "extraction.max_description_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"extraction": {"max_line_distance": 4}}"#).unwrap();

        assert_eq!(config.extraction.max_line_distance, 4);
        assert_eq!(config.extraction.header_keyword_threshold, 3);
        assert_eq!(config.eta.default_minutes, 30);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = TrackerConfig::default();
        config.extraction.header_keyword_threshold = 0;
        assert!(config.validate().is_err());
    }
}
