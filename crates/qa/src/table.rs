use haqei_iching::{HexagramTable, TableIssue, TransformTable};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub edges: usize,
    pub involution: bool,
    pub issues: Vec<TableIssue>,
}

impl TableReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.involution && self.issues.is_empty()
    }
}

/// Check a transform table against the King Wen line patterns
#[must_use]
pub fn verify_transform_table(transforms: &TransformTable) -> TableReport {
    let issues = transforms.verify(HexagramTable::king_wen());
    let report = TableReport {
        edges: transforms.edge_count(),
        involution: transforms.is_involution(),
        issues,
    };
    if !report.is_clean() {
        log::warn!(
            "Transform table has {} issues (involution: {})",
            report.issues.len(),
            report.involution
        );
    }
    report
}
