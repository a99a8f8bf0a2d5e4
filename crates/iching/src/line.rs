use crate::error::{IchingError, Result};
use crate::hexagram::{HexagramId, HexagramTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Line position within a hexagram, 1 = bottom, 6 = top
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LinePosition(u8);

const POSITION_NAMES: [&str; 6] = ["初", "二", "三", "四", "五", "上"];

impl LinePosition {
    pub const BOTTOM: LinePosition = LinePosition(1);
    pub const TOP: LinePosition = LinePosition(6);

    pub fn new(position: u32) -> Result<Self> {
        if (1..=6).contains(&position) {
            #[allow(clippy::cast_possible_truncation)]
            Ok(Self(position as u8))
        } else {
            Err(IchingError::InvalidPosition(position))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into a bottom-to-top line array
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Next position upward, wrapping 6 back to 1
    #[must_use]
    pub const fn advance(self) -> Self {
        Self((self.0 % 6) + 1)
    }

    /// Positional name: 初, 二, 三, 四, 五, 上
    #[must_use]
    pub const fn name(self) -> &'static str {
        POSITION_NAMES[self.index()]
    }

    pub fn all() -> impl Iterator<Item = LinePosition> {
        (1..=6).map(LinePosition)
    }
}

impl TryFrom<u32> for LinePosition {
    type Error = IchingError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LinePosition> for u32 {
    fn from(value: LinePosition) -> Self {
        u32::from(value.0)
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conventional line name combining position and polarity.
///
/// Solid lines are 九, broken lines are 六. The bottom and top lines put the
/// position first (初九, 上六); the middle four put the polarity first (九二).
#[must_use]
pub fn yao_label(position: LinePosition, solid: bool) -> String {
    let polarity = if solid { "九" } else { "六" };
    match position.get() {
        1 | 6 => format!("{}{}", position.name(), polarity),
        _ => format!("{}{}", polarity, position.name()),
    }
}

/// Parse a yao label (初九, 六二, 上六 ...) into its position and polarity
pub fn parse_yao_label(raw: &str) -> Result<(LinePosition, bool)> {
    let trimmed = raw.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() != 2 {
        return Err(IchingError::UnknownLineName(raw.to_string()));
    }

    let polarity = |ch: char| match ch {
        '九' => Some(true),
        '六' => Some(false),
        _ => None,
    };
    let position = |ch: char| {
        POSITION_NAMES
            .iter()
            .position(|name| name.starts_with(ch))
            .map(|idx| LinePosition(idx as u8 + 1))
    };

    let parsed = match (position(chars[0]), polarity(chars[1])) {
        (Some(pos), Some(solid)) if matches!(pos.get(), 1 | 6) => Some((pos, solid)),
        _ => match (polarity(chars[0]), position(chars[1])) {
            (Some(solid), Some(pos)) if (2..=5).contains(&pos.get()) => Some((pos, solid)),
            _ => None,
        },
    };

    parsed.ok_or_else(|| IchingError::UnknownLineName(raw.to_string()))
}

/// A single line of a specific hexagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRef {
    pub hexagram: HexagramId,
    pub position: LinePosition,
}

impl LineRef {
    #[must_use]
    pub const fn new(hexagram: HexagramId, position: LinePosition) -> Self {
        Self { hexagram, position }
    }

    /// Validate raw numbers into a line reference
    pub fn from_raw(hexagram: u32, position: u32) -> Result<Self> {
        Ok(Self::new(HexagramId::new(hexagram)?, LinePosition::new(position)?))
    }

    /// Yao label of this line in the given table
    #[must_use]
    pub fn yao_label(&self, table: &HexagramTable) -> String {
        let solid = table.get(self.hexagram).is_solid(self.position);
        yao_label(self.position, solid)
    }

    /// Resolve `(hexagram name, yao label)` back into a line reference.
    ///
    /// The label's polarity must agree with the hexagram's actual line.
    pub fn from_names(table: &HexagramTable, hexagram_name: &str, line_name: &str) -> Result<Self> {
        let hexagram = table.by_name(hexagram_name)?;
        let (position, solid) = parse_yao_label(line_name)?;
        if table.get(hexagram).is_solid(position) != solid {
            return Err(IchingError::UnknownLineName(format!(
                "{line_name} (not a line of {})",
                table.name(hexagram)
            )));
        }
        Ok(Self::new(hexagram, position))
    }

    /// Every line of every hexagram, hexagram-major
    pub fn all() -> impl Iterator<Item = LineRef> {
        HexagramId::all().flat_map(|hex| LinePosition::all().map(move |pos| LineRef::new(hex, pos)))
    }
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hexagram, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_top_to_bottom() {
        assert_eq!(LinePosition::new(5).unwrap().advance().get(), 6);
        assert_eq!(LinePosition::TOP.advance(), LinePosition::BOTTOM);
    }

    #[test]
    fn test_position_bounds() {
        assert!(LinePosition::new(0).is_err());
        assert!(LinePosition::new(7).is_err());
        assert_eq!(LinePosition::all().count(), 6);
    }

    #[test]
    fn test_yao_labels() {
        let pos = |p| LinePosition::new(p).unwrap();
        assert_eq!(yao_label(pos(1), true), "初九");
        assert_eq!(yao_label(pos(1), false), "初六");
        assert_eq!(yao_label(pos(2), true), "九二");
        assert_eq!(yao_label(pos(5), false), "六五");
        assert_eq!(yao_label(pos(6), true), "上九");
        assert_eq!(yao_label(pos(6), false), "上六");
    }

    #[test]
    fn test_parse_yao_label_round_trips() {
        for pos in LinePosition::all() {
            for solid in [true, false] {
                let label = yao_label(pos, solid);
                assert_eq!(parse_yao_label(&label).unwrap(), (pos, solid));
            }
        }
        assert!(parse_yao_label("九初").is_err());
        assert!(parse_yao_label("二六").is_err());
        assert!(parse_yao_label("用九").is_err());
    }

    #[test]
    fn test_line_ref_from_names_checks_polarity() {
        let table = HexagramTable::king_wen();
        let line = LineRef::from_names(table, "乾為天", "九五").unwrap();
        assert_eq!(line, LineRef::from_raw(1, 5).unwrap());
        assert_eq!(line.yao_label(table), "九五");

        assert!(LineRef::from_names(table, "乾為天", "六五").is_err());
        assert_eq!(LineRef::all().count(), 384);
    }
}
