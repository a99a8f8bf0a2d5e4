use crate::entry::NarrativeEntry;
use crate::error::{NarrativeError, Result};
use crate::key::NarrativeKey;
use haqei_iching::{HexagramId, LinePosition, LineRef, PathSignature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Items a complete bundle holds (6 lines x 8 signatures)
pub const ITEMS_PER_BUNDLE: usize = 48;

/// All curated entries starting in one hexagram, as stored in `hex-{N}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub hexagram: HexagramId,
    #[serde(default)]
    pub items: BTreeMap<String, NarrativeEntry>,
}

impl Bundle {
    #[must_use]
    pub fn new(hexagram: HexagramId) -> Self {
        Self {
            hexagram,
            items: BTreeMap::new(),
        }
    }

    /// Parse a bundle file and check it belongs to `expected`.
    ///
    /// Every item key must name a line of `expected` and every entry must
    /// validate against its key.
    pub fn from_slice(bytes: &[u8], expected: HexagramId) -> Result<Self> {
        let bundle: Bundle = serde_json::from_slice(bytes)?;
        bundle.validate(expected)?;
        Ok(bundle)
    }

    pub fn validate(&self, expected: HexagramId) -> Result<()> {
        if self.hexagram != expected {
            return Err(NarrativeError::integrity(format!(
                "bundle declares hexagram {} but was requested as {expected}",
                self.hexagram
            )));
        }
        for (raw_key, entry) in &self.items {
            let key = NarrativeKey::parse_bundle(raw_key)?;
            if key.line.hexagram != expected {
                return Err(NarrativeError::integrity(format!(
                    "item {raw_key} does not belong to hexagram {expected}"
                )));
            }
            entry
                .validate(key.line, key.signature)
                .map_err(|e| NarrativeError::integrity(format!("item {raw_key}: {e}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, position: LinePosition, signature: PathSignature) -> Option<&NarrativeEntry> {
        let key = NarrativeKey::new(LineRef::new(self.hexagram, position), signature);
        self.items.get(&key.bundle_key())
    }

    pub fn insert(&mut self, key: NarrativeKey, entry: NarrativeEntry) -> Option<NarrativeEntry> {
        self.items.insert(key.bundle_key(), entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.items.len() == ITEMS_PER_BUNDLE
    }
}
