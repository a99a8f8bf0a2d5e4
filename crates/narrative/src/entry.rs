use crate::error::{NarrativeError, Result};
use chrono::{DateTime, Utc};
use haqei_iching::{HexagramId, LinePosition, LineRef, PathSignature};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stages {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub second: String,
    #[serde(default, rename = "final")]
    pub last: String,
}

impl Stages {
    #[must_use]
    pub fn as_array(&self) -> [&str; 3] {
        [&self.first, &self.second, &self.last]
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.as_array().iter().all(|s| !s.trim().is_empty())
    }
}

/// Starting line as recorded in an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRef {
    pub hex: HexagramId,
    pub pos: LinePosition,
    pub name: String,
}

/// Line the three-step walk ends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRef {
    pub hex: HexagramId,
    pub pos: LinePosition,
}

impl From<LineRef> for FinalRef {
    fn from(value: LineRef) -> Self {
        Self {
            hex: value.hexagram,
            pos: value.position,
        }
    }
}

/// Plain-language rewrite of an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasyVariant {
    #[serde(default)]
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Stages>,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub caution: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub next3: Vec<String>,
}

/// One curated narrative for a `(start line, signature)` combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEntry {
    /// Path signature this entry narrates
    pub label: PathSignature,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub stages: Stages,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    pub start: StartRef,
    #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
    pub final_line: Option<FinalRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easy: Option<EasyVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub placeholder: bool,
    /// Fields this crate does not model (chain_long, ...), kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NarrativeEntry {
    /// Empty entry to be filled in by an author
    #[must_use]
    pub fn skeleton(
        start: LineRef,
        start_name: impl Into<String>,
        signature: PathSignature,
        destination: LineRef,
    ) -> Self {
        Self {
            label: signature,
            headline: String::new(),
            stages: Stages::default(),
            tone: None,
            suitability: None,
            caution: None,
            outcome: None,
            why: None,
            start: StartRef {
                hex: start.hexagram,
                pos: start.position,
                name: start_name.into(),
            },
            final_line: Some(destination.into()),
            easy: None,
            updated_at: Some(Utc::now()),
            placeholder: true,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn start_line(&self) -> LineRef {
        LineRef::new(self.start.hex, self.start.pos)
    }

    /// Check the entry against the key it is stored under.
    ///
    /// Placeholders may have empty prose; everything else needs a headline
    /// and all three stages.
    pub fn validate(&self, key_start: LineRef, key_signature: PathSignature) -> Result<()> {
        if self.label != key_signature {
            return Err(NarrativeError::integrity(format!(
                "label {} does not match key signature {key_signature}",
                self.label
            )));
        }
        if self.start_line() != key_start {
            return Err(NarrativeError::integrity(format!(
                "start {} does not match key line {key_start}",
                self.start_line()
            )));
        }
        if !self.placeholder {
            if self.headline.trim().is_empty() {
                return Err(NarrativeError::integrity("empty headline"));
            }
            if !self.stages.is_complete() {
                return Err(NarrativeError::integrity("incomplete stages"));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
