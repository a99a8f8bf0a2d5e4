//! Key formats shared by the authoring store, the bundles, and QA.
//!
//! - authoring key: `"{hexagram name} {yao label} | {signature}"`
//! - bundle item key: `"{hexagram}_{position}_{signature}"`
//! - bundle file name: `"hex-{hexagram}.json"`

use crate::error::{NarrativeError, Result};
use haqei_iching::{HexagramId, HexagramTable, LinePosition, LineRef, PathSignature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Build an authoring key from its parts
#[must_use]
pub fn build_key(hexagram_name: &str, line_name: &str, signature: PathSignature) -> String {
    format!("{hexagram_name} {line_name} | {signature}")
}

#[must_use]
pub fn bundle_item_key(line: LineRef, signature: PathSignature) -> String {
    format!("{}_{}_{}", line.hexagram, line.position, signature)
}

#[must_use]
pub fn bundle_file_name(hexagram: HexagramId) -> String {
    format!("hex-{hexagram}.json")
}

/// Parse `hex-{N}.json` back into a hexagram id
#[must_use]
pub fn parse_bundle_file_name(name: &str) -> Option<HexagramId> {
    let number = name.strip_prefix("hex-")?.strip_suffix(".json")?;
    HexagramId::new(number.parse().ok()?).ok()
}

/// One of the 3072 `(start line, signature)` combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NarrativeKey {
    pub line: LineRef,
    pub signature: PathSignature,
}

impl NarrativeKey {
    #[must_use]
    pub const fn new(line: LineRef, signature: PathSignature) -> Self {
        Self { line, signature }
    }

    /// Every combination, hexagram-major then position then signature order
    pub fn all() -> impl Iterator<Item = NarrativeKey> {
        LineRef::all().flat_map(|line| {
            PathSignature::ALL
                .into_iter()
                .map(move |sig| NarrativeKey::new(line, sig))
        })
    }

    /// Canonical authoring key
    #[must_use]
    pub fn authoring_key(&self, table: &HexagramTable) -> String {
        build_key(
            table.name(self.line.hexagram),
            &self.line.yao_label(table),
            self.signature,
        )
    }

    #[must_use]
    pub fn bundle_key(&self) -> String {
        bundle_item_key(self.line, self.signature)
    }

    /// Parse an authoring key, accepting variant hexagram spellings
    pub fn parse_authoring(table: &HexagramTable, raw: &str) -> Result<Self> {
        let invalid = || NarrativeError::integrity(format!("malformed narrative key: {raw:?}"));
        let (head, sig) = raw.rsplit_once('|').ok_or_else(invalid)?;
        let (name, line_name) = head.trim().rsplit_once(' ').ok_or_else(invalid)?;
        let line = LineRef::from_names(table, name, line_name)?;
        let signature = sig.trim().parse()?;
        Ok(Self::new(line, signature))
    }

    pub fn parse_bundle(raw: &str) -> Result<Self> {
        let invalid = || NarrativeError::integrity(format!("malformed bundle item key: {raw:?}"));
        let mut parts = raw.splitn(3, '_');
        let (Some(hex), Some(pos), Some(sig)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let hexagram = HexagramId::new(hex.parse().map_err(|_| invalid())?)?;
        let position = LinePosition::new(pos.parse().map_err(|_| invalid())?)?;
        Ok(Self::new(LineRef::new(hexagram, position), sig.parse()?))
    }
}

impl fmt::Display for NarrativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bundle_key())
    }
}
