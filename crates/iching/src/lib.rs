//! # HAQEI I Ching
//!
//! Static hexagram tables and the three-step path walk that every narrative
//! is built from.
//!
//! ## Features
//!
//! - **King Wen table** - 64 hexagrams with canonical names and line patterns
//! - **Name folding** - variant spellings (沢/澤, 无/無, ...) resolve to one name
//! - **Transform edges** - 384 precomputed "change one line" edges
//! - **Path walking** - `J` advances a line, `H` changes it
//!
//! ## Architecture
//!
//! ```text
//! Trigram (8)
//!     │
//!     └──> HexagramTable (64, Lazy static)
//!            ├─ by number / by name / by line pattern
//!            │
//!            └──> TransformTable (384 edges)
//!                   │
//!                   └──> PathWalker::walk(start, JHJ)
//!                          └─ [Step; 3]  (hexagram, line, action)
//! ```

mod error;
mod hexagram;
mod line;
mod path;
mod transform;
mod trigram;

pub use error::{IchingError, Result};
pub use hexagram::{fold_name_variants, Hexagram, HexagramId, HexagramTable};
pub use line::{parse_yao_label, yao_label, LinePosition, LineRef};
pub use path::{Action, Move, PathSignature, PathWalker, Step};
pub use transform::{TableIssue, TransformRow, TransformTable};
pub use trigram::Trigram;
