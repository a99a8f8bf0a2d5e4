use crate::base_table::BaseTable;
use crate::bundle::Bundle;
use crate::entry::NarrativeEntry;
use crate::error::{NarrativeError, Result};
use crate::key::{bundle_file_name, NarrativeKey};
use haqei_iching::{HexagramId, HexagramTable, LineRef, PathSignature, PathWalker};
use std::collections::BTreeMap;
use std::path::Path;

/// Authoring database: every curated entry, keyed by authoring key
#[derive(Debug, Clone, Default)]
pub struct NarrativeStore {
    entries: BTreeMap<String, NarrativeEntry>,
    walker: PathWalker,
}

impl NarrativeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the authoring JSON map; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Narrative store {} does not exist yet; starting empty", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse the authoring map, folding key spellings to the canonical form.
    ///
    /// Keys that cannot be parsed are kept as they are. Two keys that fold to
    /// the same canonical key are an integrity error.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, NarrativeEntry> = serde_json::from_str(json)?;
        let table = HexagramTable::king_wen();
        let mut entries = BTreeMap::new();

        for (raw_key, entry) in raw {
            let key = match NarrativeKey::parse_authoring(table, &raw_key) {
                Ok(key) => {
                    entry
                        .validate(key.line, key.signature)
                        .map_err(|e| NarrativeError::integrity(format!("{raw_key}: {e}")))?;
                    key.authoring_key(table)
                }
                Err(e) => {
                    log::warn!("Keeping unparseable narrative key {raw_key:?}: {e}");
                    raw_key.clone()
                }
            };
            if key != raw_key {
                log::debug!("Canonicalized narrative key {raw_key:?} -> {key:?}");
            }
            if entries.insert(key.clone(), entry).is_some() {
                return Err(NarrativeError::integrity(format!(
                    "duplicate narrative key after canonicalization: {key}"
                )));
            }
        }

        Ok(Self {
            entries,
            walker: PathWalker::default(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, line: LineRef, signature: PathSignature) -> Option<&NarrativeEntry> {
        let key = NarrativeKey::new(line, signature).authoring_key(HexagramTable::king_wen());
        self.entries.get(&key)
    }

    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&NarrativeEntry> {
        self.entries.get(key)
    }

    /// Insert or replace the entry for `key`, returning the previous one.
    ///
    /// The entry's `updated_at` is set to now.
    pub fn insert(&mut self, key: NarrativeKey, mut entry: NarrativeEntry) -> Result<Option<NarrativeEntry>> {
        entry.validate(key.line, key.signature)?;
        entry.touch();
        let authoring = key.authoring_key(HexagramTable::king_wen());
        Ok(self.entries.insert(authoring, entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NarrativeEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert a placeholder for every `(base row, signature)` key not yet present.
    ///
    /// Existing entries are never touched. Returns the number inserted.
    pub fn backfill_skeletons(&mut self, base: &BaseTable) -> usize {
        let table = HexagramTable::king_wen();
        let mut inserted = 0;

        for row in base.rows() {
            for signature in PathSignature::ALL {
                let key = NarrativeKey::new(row.line, signature);
                let authoring = key.authoring_key(table);
                if self.entries.contains_key(&authoring) {
                    continue;
                }
                let destination = self.walker.destination(row.line, signature);
                let start_name = format!("{} {}", row.hexagram_name, row.line_name);
                let skeleton = NarrativeEntry::skeleton(row.line, start_name, signature, destination);
                self.entries.insert(authoring, skeleton);
                inserted += 1;
            }
        }

        if inserted > 0 {
            log::info!("Backfilled {inserted} placeholder narratives");
        }
        inserted
    }

    /// Group entries into one bundle per hexagram; all 64 bundles are returned
    #[must_use]
    pub fn to_bundles(&self, table: &HexagramTable) -> BTreeMap<HexagramId, Bundle> {
        let mut bundles: BTreeMap<HexagramId, Bundle> =
            HexagramId::all().map(|id| (id, Bundle::new(id))).collect();

        for (raw_key, entry) in &self.entries {
            match NarrativeKey::parse_authoring(table, raw_key) {
                Ok(key) => {
                    if let Some(bundle) = bundles.get_mut(&key.line.hexagram) {
                        bundle.insert(key, entry.clone());
                    }
                }
                Err(e) => log::warn!("Skipping {raw_key:?} while bundling: {e}"),
            }
        }
        bundles
    }

    /// Write `hex-{N}.json` for all 64 hexagrams into `dir`; returns files written
    pub fn write_bundles(&self, dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dir)?;
        let bundles = self.to_bundles(HexagramTable::king_wen());
        for (hexagram, bundle) in &bundles {
            let path = dir.join(bundle_file_name(*hexagram));
            let json = serde_json::to_string_pretty(bundle)?;
            std::fs::write(&path, json)?;
            log::debug!("Wrote {} ({} items)", path.display(), bundle.len());
        }
        Ok(bundles.len())
    }
}
