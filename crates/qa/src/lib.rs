//! # HAQEI QA
//!
//! Build-time checks over narrative content. Findings are report values,
//! not errors; callers decide whether a gap should fail a build.
//!
//! ## Checks
//!
//! - **Coverage** - which of the 3072 keys the authoring store holds, plus
//!   what the `hex-*.json` bundle directory contains
//! - **Duplication** - headline/stage overlap by character-set similarity
//! - **Style** - terminator, length, punctuation, and archaic phrasing rules
//!   for the line-state text table
//! - **Transform table** - every edge is a single-line flip and an involution

mod config;
mod coverage;
mod duplication;
mod error;
mod report;
mod style;
mod table;

pub use config::{CoverageConfig, DuplicationConfig, QaConfig, StyleConfig};
pub use coverage::{check_bundle_dir, check_coverage, BundleCoverage, CoverageReport, InvalidBundle};
pub use duplication::{
    check_duplication, DuplicationFinding, DuplicationIssue, DuplicationReport, Stage,
};
pub use error::{QaError, Result};
pub use report::{
    render_coverage_report, render_duplication_report, render_style_report, render_table_report,
};
pub use style::{load_line_states, LineState, StyleFinding, StyleIssue, StyleLinter, StyleReport};
pub use table::{verify_transform_table, TableReport};
