use crate::error::{NarrativeError, Result};
use haqei_iching::{parse_yao_label, HexagramId, HexagramTable, LinePosition, LineRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_JSON: &str = include_str!("../../../data/h384.json");

/// Rows expected in a complete table (64 hexagrams x 6 lines)
pub const EXPECTED_ROWS: usize = 384;

/// Interpretation of a single line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseRow {
    pub line: LineRef,
    /// Canonical hexagram name
    pub hexagram_name: String,
    /// Yao label (初九, 六二, ...)
    pub line_name: String,
    pub summary: String,
    pub summary_plain: Option<String>,
    pub keywords: Vec<String>,
}

impl BaseRow {
    #[must_use]
    pub fn top_keyword(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }

    /// Summary text, preferring the plain-language variant when asked and present
    #[must_use]
    pub fn summary_text(&self, prefer_plain: bool) -> &str {
        match &self.summary_plain {
            Some(plain) if prefer_plain && !plain.trim().is_empty() => plain,
            _ => &self.summary,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Keywords {
    List(Vec<String>),
    Joined(String),
}

impl Keywords {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Keywords::List(list) => list,
            Keywords::Joined(joined) => joined
                .split(['、', ',', '，'])
                .map(str::to_string)
                .collect(),
        };
        raw.into_iter()
            .map(|kw| kw.trim().to_string())
            .filter(|kw| !kw.is_empty())
            .collect()
    }
}

/// Row as it appears in the JSON file; accepts the Japanese column names too
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(alias = "卦番号")]
    hexagram: u32,
    #[serde(alias = "卦名")]
    hexagram_name: String,
    #[serde(default)]
    position: Option<u32>,
    #[serde(alias = "爻")]
    line_name: String,
    #[serde(alias = "現代解釈の要約")]
    summary: String,
    #[serde(default, alias = "現代解釈の要約_plain")]
    summary_plain: Option<String>,
    #[serde(default, alias = "キーワード")]
    keywords: Option<Keywords>,
}

impl RawRow {
    /// 用九 / 用六 rows sit outside the six positions
    fn is_extra_line(&self) -> bool {
        self.position == Some(7) || matches!(self.line_name.trim(), "用九" | "用六")
    }
}

/// The 384-row line interpretation table
#[derive(Debug, Clone)]
pub struct BaseTable {
    rows: BTreeMap<LineRef, BaseRow>,
}

impl BaseTable {
    /// Table compiled into the binary from `data/h384.json`
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_JSON)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| match e {
            NarrativeError::DataIntegrity(msg) => {
                NarrativeError::integrity(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate a JSON array of rows.
    ///
    /// Names are folded to their canonical spelling and every label must
    /// agree with the hexagram's line pattern. Duplicate lines are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw_rows: Vec<RawRow> = serde_json::from_str(json)?;
        let hexagrams = HexagramTable::king_wen();
        let mut rows = BTreeMap::new();
        let mut skipped = 0usize;

        for raw in raw_rows {
            if raw.is_extra_line() {
                skipped += 1;
                continue;
            }
            let row = Self::validate_row(hexagrams, raw)?;
            if rows.insert(row.line, row.clone()).is_some() {
                return Err(NarrativeError::integrity(format!(
                    "duplicate row for {} {}",
                    row.hexagram_name, row.line_name
                )));
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {skipped} 用九/用六 rows in base table");
        }
        Ok(Self { rows })
    }

    fn validate_row(hexagrams: &HexagramTable, raw: RawRow) -> Result<BaseRow> {
        let hexagram = HexagramId::new(raw.hexagram)?;
        let canonical = hexagrams.canonical_name(&raw.hexagram_name)?;
        if canonical != hexagrams.name(hexagram) {
            return Err(NarrativeError::integrity(format!(
                "row names {} but hexagram {hexagram} is {}",
                raw.hexagram_name,
                hexagrams.name(hexagram)
            )));
        }

        let (label_position, solid) = parse_yao_label(&raw.line_name)?;
        let position = match raw.position {
            Some(p) => LinePosition::new(p)?,
            None => label_position,
        };
        let line = LineRef::new(hexagram, position);
        let expected_label = line.yao_label(hexagrams);
        if label_position != position || hexagrams.get(hexagram).is_solid(position) != solid {
            return Err(NarrativeError::integrity(format!(
                "{canonical} line {position} is labelled {} (expected {expected_label})",
                raw.line_name
            )));
        }

        Ok(BaseRow {
            line,
            hexagram_name: canonical.to_string(),
            line_name: expected_label,
            summary: raw.summary.trim().to_string(),
            summary_plain: raw.summary_plain.map(|s| s.trim().to_string()),
            keywords: raw.keywords.map(Keywords::into_vec).unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn get(&self, line: LineRef) -> Option<&BaseRow> {
        self.rows.get(&line)
    }

    /// Row for `line`, or `MissingData`
    pub fn require(&self, line: LineRef) -> Result<&BaseRow> {
        self.get(line).ok_or(NarrativeError::MissingData {
            hexagram: line.hexagram.get(),
            position: line.position.get(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = &BaseRow> {
        self.rows.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rows.len() == EXPECTED_ROWS
    }

    /// Lines with no row
    #[must_use]
    pub fn missing_lines(&self) -> Vec<LineRef> {
        LineRef::all().filter(|line| !self.rows.contains_key(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_complete() {
        let table = BaseTable::builtin().unwrap();
        assert_eq!(table.len(), EXPECTED_ROWS);
        assert!(table.is_complete());
        assert!(table.missing_lines().is_empty());

        let row = table.get(LineRef::from_raw(1, 5).unwrap()).unwrap();
        assert_eq!(row.hexagram_name, "乾為天");
        assert_eq!(row.line_name, "九五");
        assert_eq!(row.top_keyword(), Some("成功"));
        assert_eq!(row.summary, "最高の地位に達し、広く影響力を及ぼす時。真のリーダーとなる。");
        assert_eq!(
            row.summary_text(true),
            "事業の成功、昇進、リーダーとしての地位確立。"
        );
        assert!(table
            .rows()
            .all(|row| row.summary_plain.is_some() && !row.keywords.is_empty()));
    }

    #[test]
    fn test_japanese_columns_and_extra_lines() {
        let json = r#"[
            {"卦番号": 2, "卦名": "坤為地", "爻": "初六", "現代解釈の要約": "静かに始まる。", "キーワード": "柔順、受容"},
            {"卦番号": 2, "卦名": "坤為地", "爻": "用六", "現代解釈の要約": "全体を貫く。"},
            {"卦番号": 17, "卦名": "沢雷隨", "爻": "初九", "現代解釈の要約": "従う。", "現代解釈の要約_plain": "ついていく。", "キーワード": ["随従"]}
        ]"#;
        let table = BaseTable::from_json(json).unwrap();
        assert_eq!(table.len(), 2);

        let kun = table.get(LineRef::from_raw(2, 1).unwrap()).unwrap();
        assert_eq!(kun.keywords, vec!["柔順", "受容"]);

        let sui = table.get(LineRef::from_raw(17, 1).unwrap()).unwrap();
        assert_eq!(sui.hexagram_name, "澤雷随");
        assert_eq!(sui.summary_text(true), "ついていく。");
        assert_eq!(sui.summary_text(false), "従う。");
        assert!(!table.is_complete());
    }

    #[test]
    fn test_rejects_label_disagreeing_with_lines() {
        let json = r#"[{"hexagram": 1, "hexagram_name": "乾為天", "position": 5, "line_name": "六五", "summary": "x", "keywords": []}]"#;
        let err = BaseTable::from_json(json).unwrap_err();
        assert!(matches!(err, NarrativeError::DataIntegrity(_)));
    }

    #[test]
    fn test_rejects_duplicate_rows() {
        let row = r#"{"hexagram": 1, "hexagram_name": "乾為天", "line_name": "初九", "summary": "x"}"#;
        let json = format!("[{row}, {row}]");
        assert!(BaseTable::from_json(&json).is_err());
    }

    #[test]
    fn test_require_reports_missing_line() {
        let table = BaseTable::from_json("[]").unwrap();
        let err = table.require(LineRef::from_raw(3, 4).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            NarrativeError::MissingData {
                hexagram: 3,
                position: 4
            }
        ));
    }
}
