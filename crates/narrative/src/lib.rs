//! # HAQEI Narrative
//!
//! Turns a `(start line, path signature)` pair into text, either composed
//! from the 384-row base table or looked up in curated bundles.
//!
//! ## Architecture
//!
//! ```text
//! data/h384.json ──> BaseTable (384 rows)
//!                        │
//!                        └──> NarrativeComposer::compose(start, sig)
//!                               ├─ PathWalker::walk -> [Step; 3]
//!                               └─ one sentence per step + closing
//!
//! authoring JSON ──> NarrativeStore ("乾為天 九五 | JJH" -> entry)
//!                        │  backfill_skeletons / write_bundles
//!                        ▼
//!                 hex-{N}.json bundles
//!                        │
//!                        └──> ScenarioDbProvider (BundleSource)
//!                               ├─ easy root, then standard root
//!                               ├─ per-hexagram cache + negative cache
//!                               └─ in-flight loads shared via watch channel
//! ```

mod base_table;
mod bundle;
mod composer;
mod entry;
mod error;
mod key;
mod provider;
mod store;
pub mod text;

pub use base_table::{BaseRow, BaseTable, EXPECTED_ROWS};
pub use bundle::{Bundle, ITEMS_PER_BUNDLE};
pub use composer::{
    ComposedNarrative, ComposedStep, ComposerOptions, NarrativeComposer, PLACEHOLDER_TEXT,
};
pub use entry::{EasyVariant, FinalRef, NarrativeEntry, Stages, StartRef};
pub use error::{NarrativeError, Result};
pub use key::{
    build_key, bundle_file_name, bundle_item_key, parse_bundle_file_name, NarrativeKey,
};
pub use provider::{
    BundleSource, FsBundleSource, ProviderConfig, ProviderStats, ResolvedEntry,
    ScenarioDbProvider, Variant,
};
pub use store::NarrativeStore;
pub use text::similarity;
