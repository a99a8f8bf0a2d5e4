use crate::error::{IchingError, Result};
use crate::hexagram::{HexagramId, HexagramTable};
use crate::line::{LinePosition, LineRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Precomputed "change one line" edges: `(hexagram, position) -> hexagram`
#[derive(Debug, Clone)]
pub struct TransformTable {
    rows: HashMap<HexagramId, [Option<HexagramId>; 6]>,
}

/// One row of an externally supplied transform map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRow {
    pub hexagram: HexagramId,
    /// Target per position, bottom-to-top
    pub targets: [HexagramId; 6],
}

/// Disagreement between a transform table and the hexagram line patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableIssue {
    MissingRow {
        hexagram: HexagramId,
    },
    MissingEdge {
        line: LineRef,
    },
    WrongTarget {
        line: LineRef,
        expected: HexagramId,
        actual: HexagramId,
    },
}

impl TransformTable {
    /// Derive all 384 edges by flipping each line of each hexagram
    #[must_use]
    pub fn king_wen() -> Self {
        let table = HexagramTable::king_wen();
        let rows = table
            .iter()
            .map(|hexagram| {
                let mut targets = [None; 6];
                for pos in LinePosition::all() {
                    targets[pos.index()] = flipped(table, hexagram.id, pos);
                }
                (hexagram.id, targets)
            })
            .collect();
        Self { rows }
    }

    /// Build from externally supplied rows; rows may be missing
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = TransformRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| (row.hexagram, row.targets.map(Some)))
            .collect();
        Self { rows }
    }

    /// Parse a JSON array of `{"hexagram": N, "targets": [..6]}` rows
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<TransformRow> = serde_json::from_str(json)
            .map_err(|e| IchingError::integrity(format!("transform table: {e}")))?;
        Ok(Self::from_rows(rows))
    }

    /// Hexagram reached by changing the given line.
    ///
    /// A table without a row for `hexagram` returns the input unchanged.
    #[must_use]
    pub fn transform(&self, hexagram: HexagramId, position: LinePosition) -> HexagramId {
        match self.rows.get(&hexagram).and_then(|row| row[position.index()]) {
            Some(target) => target,
            None => {
                log::warn!(
                    "Transform table has no edge for hexagram {hexagram} line {position}; keeping hexagram"
                );
                hexagram
            }
        }
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.rows
            .values()
            .map(|row| row.iter().filter(|t| t.is_some()).count())
            .sum()
    }

    /// Applying the same line change twice returns to the start, for every edge present
    #[must_use]
    pub fn is_involution(&self) -> bool {
        self.rows.iter().all(|(&hex, row)| {
            LinePosition::all().all(|pos| match row[pos.index()] {
                Some(target) => self
                    .rows
                    .get(&target)
                    .and_then(|back| back[pos.index()])
                    .is_some_and(|back| back == hex),
                None => true,
            })
        })
    }

    /// Compare every edge with the single-line flip of `table`
    #[must_use]
    pub fn verify(&self, table: &HexagramTable) -> Vec<TableIssue> {
        let mut issues = Vec::new();
        for hexagram in HexagramId::all() {
            let Some(row) = self.rows.get(&hexagram) else {
                issues.push(TableIssue::MissingRow { hexagram });
                continue;
            };
            for pos in LinePosition::all() {
                let line = LineRef::new(hexagram, pos);
                let Some(expected) = flipped(table, hexagram, pos) else {
                    continue;
                };
                match row[pos.index()] {
                    None => issues.push(TableIssue::MissingEdge { line }),
                    Some(actual) if actual != expected => issues.push(TableIssue::WrongTarget {
                        line,
                        expected,
                        actual,
                    }),
                    Some(_) => {}
                }
            }
        }
        issues
    }
}

impl Default for TransformTable {
    fn default() -> Self {
        Self::king_wen()
    }
}

fn flipped(table: &HexagramTable, hexagram: HexagramId, position: LinePosition) -> Option<HexagramId> {
    let mut lines = table.get(hexagram).lines;
    lines[position.index()] = !lines[position.index()];
    table.by_lines(&lines)
}
