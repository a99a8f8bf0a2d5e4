use crate::config::StyleConfig;
use crate::error::Result;
use haqei_narrative::text::TERMINATORS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// One row of the plain line-state text table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineState {
    pub name: String,
    #[serde(alias = "now")]
    pub text: String,
}

pub fn load_line_states(path: &Path) -> Result<Vec<LineState>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleIssue {
    /// Text must hold exactly one sentence terminator
    TerminatorCount { count: usize },
    TerminatorNotAtEnd,
    TooShort { chars: usize, min: usize },
    TooLong { chars: usize, max: usize },
    BannedSequence { sequence: String },
    ArchaicWord { word: String },
    ArchaicPattern { pattern: String, matched: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleFinding {
    pub name: String,
    #[serde(flatten)]
    pub issue: StyleIssue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleReport {
    pub checked: usize,
    pub findings: Vec<StyleFinding>,
}

impl StyleReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Rows with at least one finding
    #[must_use]
    pub fn failing_rows(&self) -> usize {
        self.findings
            .iter()
            .map(|f| f.name.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

pub struct StyleLinter {
    config: StyleConfig,
    patterns: Vec<Regex>,
}

impl StyleLinter {
    pub fn new(config: StyleConfig) -> Result<Self> {
        let patterns = config.compiled_patterns()?;
        Ok(Self { config, patterns })
    }

    #[must_use]
    pub fn check_text(&self, text: &str) -> Vec<StyleIssue> {
        let text = text.trim();
        let mut issues = Vec::new();

        let count = text.chars().filter(|c| TERMINATORS.contains(c)).count();
        if count != 1 {
            issues.push(StyleIssue::TerminatorCount { count });
        }
        if count > 0 && !text.ends_with(|c: char| TERMINATORS.contains(&c)) {
            issues.push(StyleIssue::TerminatorNotAtEnd);
        }

        let chars = text.graphemes(true).count();
        if chars < self.config.min_chars {
            issues.push(StyleIssue::TooShort {
                chars,
                min: self.config.min_chars,
            });
        } else if chars > self.config.max_chars {
            issues.push(StyleIssue::TooLong {
                chars,
                max: self.config.max_chars,
            });
        }

        for sequence in &self.config.banned_sequences {
            if text.contains(sequence.as_str()) {
                issues.push(StyleIssue::BannedSequence {
                    sequence: sequence.clone(),
                });
            }
        }
        for word in &self.config.archaic_words {
            if text.contains(word.as_str()) {
                issues.push(StyleIssue::ArchaicWord { word: word.clone() });
            }
        }
        for pattern in &self.patterns {
            if let Some(m) = pattern.find(text) {
                issues.push(StyleIssue::ArchaicPattern {
                    pattern: pattern.as_str().to_string(),
                    matched: m.as_str().to_string(),
                });
            }
        }

        issues
    }

    #[must_use]
    pub fn lint(&self, states: &[LineState]) -> StyleReport {
        let findings = states
            .iter()
            .flat_map(|state| {
                self.check_text(&state.text)
                    .into_iter()
                    .map(|issue| StyleFinding {
                        name: state.name.clone(),
                        issue,
                    })
            })
            .collect();
        StyleReport {
            checked: states.len(),
            findings,
        }
    }
}
