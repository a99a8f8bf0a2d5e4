use crate::error::Result;
use haqei_iching::{HexagramId, PathSignature};
use haqei_narrative::{
    build_key, parse_bundle_file_name, BaseTable, Bundle, NarrativeStore, ITEMS_PER_BUNDLE,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Keys the base table implies (rows x 8 signatures)
    pub expected: usize,
    /// Keys with an entry, placeholders included
    pub present: usize,
    pub missing: usize,
    /// `present / expected` as a percentage
    pub percentage: f64,
    /// Present entries still marked as placeholders
    pub placeholders: usize,
    pub missing_sample: Vec<String>,
}

impl CoverageReport {
    #[must_use]
    pub fn has_gap(&self) -> bool {
        self.missing > 0
    }

    /// Entries with real prose
    #[must_use]
    pub fn authored(&self) -> usize {
        self.present - self.placeholders
    }
}

/// Count which `(row, signature)` keys the store covers
#[must_use]
pub fn check_coverage(base: &BaseTable, store: &NarrativeStore, sample: usize) -> CoverageReport {
    let mut expected = 0;
    let mut present = 0;
    let mut placeholders = 0;
    let mut missing_sample = Vec::new();

    for row in base.rows() {
        for signature in PathSignature::ALL {
            expected += 1;
            let key = build_key(&row.hexagram_name, &row.line_name, signature);
            match store.get_raw(&key) {
                Some(entry) => {
                    present += 1;
                    if entry.placeholder {
                        placeholders += 1;
                    }
                }
                None if missing_sample.len() < sample => missing_sample.push(key),
                None => {}
            }
        }
    }

    let missing = expected - present;
    let percentage = if expected == 0 {
        0.0
    } else {
        present as f64 * 100.0 / expected as f64
    };
    log::debug!("Coverage: {present}/{expected} keys ({placeholders} placeholders)");

    CoverageReport {
        expected,
        present,
        missing,
        percentage,
        placeholders,
        missing_sample,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidBundle {
    pub file: String,
    pub error: String,
}

/// What is on disk in a bundle directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleCoverage {
    /// Item count per hexagram for every readable bundle
    pub items: BTreeMap<HexagramId, usize>,
    /// Hexagrams with no `hex-{N}.json`
    pub missing_files: Vec<HexagramId>,
    /// Readable bundles with fewer than 48 items
    pub incomplete: Vec<HexagramId>,
    pub invalid: Vec<InvalidBundle>,
    pub total_items: usize,
}

impl BundleCoverage {
    #[must_use]
    pub fn expected_items() -> usize {
        ITEMS_PER_BUNDLE * usize::from(HexagramId::MAX)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_files.is_empty() && self.invalid.is_empty() && self.incomplete.is_empty()
    }
}

/// Scan `dir` for `hex-*.json` files and validate each one
pub fn check_bundle_dir(dir: &Path) -> Result<BundleCoverage> {
    let mut items = BTreeMap::new();
    let mut invalid = Vec::new();

    for dirent in std::fs::read_dir(dir)? {
        let dirent = dirent?;
        let file_name = dirent.file_name().to_string_lossy().into_owned();
        let Some(hexagram) = parse_bundle_file_name(&file_name) else {
            continue;
        };
        let loaded = std::fs::read(dirent.path())
            .map_err(Into::into)
            .and_then(|bytes| Bundle::from_slice(&bytes, hexagram));
        match loaded {
            Ok(bundle) => {
                items.insert(hexagram, bundle.len());
            }
            Err(e) => {
                log::warn!("Invalid bundle {file_name}: {e}");
                invalid.push(InvalidBundle {
                    file: file_name,
                    error: e.to_string(),
                });
            }
        }
    }
    invalid.sort_by(|a, b| a.file.cmp(&b.file));

    let present_but_invalid: Vec<HexagramId> = invalid
        .iter()
        .filter_map(|i| parse_bundle_file_name(&i.file))
        .collect();
    let missing_files = HexagramId::all()
        .filter(|id| !items.contains_key(id) && !present_but_invalid.contains(id))
        .collect();
    let incomplete = items
        .iter()
        .filter(|(_, count)| **count < ITEMS_PER_BUNDLE)
        .map(|(id, _)| *id)
        .collect();
    let total_items = items.values().sum();

    Ok(BundleCoverage {
        items,
        missing_files,
        incomplete,
        invalid,
        total_items,
    })
}
