use crate::error::{QaError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for every QA check, loadable from TOML.
///
/// ```toml
/// [duplication]
/// similarity_threshold = 0.9
///
/// [style]
/// max_chars = 120
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QaConfig {
    pub coverage: CoverageConfig,
    pub duplication: DuplicationConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    /// Missing keys listed in the report
    pub missing_sample: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self { missing_sample: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DuplicationConfig {
    /// Flag pairs at or above this Jaccard similarity
    pub similarity_threshold: f64,
    /// Headlines shorter than this many characters are flagged
    pub min_headline_chars: usize,
}

impl Default for DuplicationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_headline_chars: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub banned_sequences: Vec<String>,
    pub archaic_words: Vec<String>,
    /// Regular expressions for archaic phrasing
    pub archaic_patterns: Vec<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            min_chars: 60,
            max_chars: 110,
            banned_sequences: owned(&["、、", "。。", "、。", "。、", "！！", "？？"]),
            archaic_words: owned(&["べし", "候", "けり", "なかれ", "給う", "いにしえ"]),
            // classical copula: a kanji noun closing a sentence with なり
            archaic_patterns: owned(&[r"[一-龥]なり。", r"ざるべから", r"(?:せ|ら)るべき"]),
        }
    }
}

impl QaConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: QaConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.duplication.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(QaError::config(format!(
                "duplication.similarity_threshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.style.min_chars > self.style.max_chars {
            return Err(QaError::config(format!(
                "style.min_chars ({}) exceeds style.max_chars ({})",
                self.style.min_chars, self.style.max_chars
            )));
        }
        if self.style.banned_sequences.iter().any(String::is_empty) {
            return Err(QaError::config("style.banned_sequences contains an empty entry"));
        }
        self.style.compiled_patterns()?;
        Ok(())
    }
}

impl StyleConfig {
    pub fn compiled_patterns(&self) -> Result<Vec<Regex>> {
        self.archaic_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| QaError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = QaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.duplication.similarity_threshold, 0.85);
        assert_eq!(config.duplication.min_headline_chars, 10);
        assert_eq!((config.style.min_chars, config.style.max_chars), (60, 110));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("qa.toml");
        std::fs::write(&path, "[duplication]\nsimilarity_threshold = 0.9\n").unwrap();

        let config = QaConfig::load(&path).unwrap();
        assert_eq!(config.duplication.similarity_threshold, 0.9);
        assert_eq!(config.duplication.min_headline_chars, 10);
        assert_eq!(config.style, StyleConfig::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(toml::from_str::<QaConfig>("[style]\nmax_len = 3\n").is_err());
        assert!(toml::from_str::<QaConfig>("[metrics]\n").is_err());
    }

    #[test]
    fn test_validate_catches_bad_values() {
        let mut config = QaConfig::default();
        config.duplication.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = QaConfig::default();
        config.style.min_chars = 200;
        assert!(config.validate().is_err());

        let mut config = QaConfig::default();
        config.style.archaic_patterns.push("(".to_string());
        assert!(matches!(config.validate(), Err(QaError::Pattern { .. })));
    }
}
