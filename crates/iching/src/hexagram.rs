use crate::error::{IchingError, Result};
use crate::line::LinePosition;
use crate::trigram::Trigram;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hexagram number in King Wen order (1..=64)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HexagramId(u8);

impl HexagramId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 64;

    pub fn new(number: u32) -> Result<Self> {
        if (u32::from(Self::MIN)..=u32::from(Self::MAX)).contains(&number) {
            #[allow(clippy::cast_possible_truncation)]
            Ok(Self(number as u8))
        } else {
            Err(IchingError::InvalidHexagram(number))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// All 64 hexagrams in King Wen order
    pub fn all() -> impl Iterator<Item = HexagramId> {
        (Self::MIN..=Self::MAX).map(HexagramId)
    }
}

impl TryFrom<u32> for HexagramId {
    type Error = IchingError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HexagramId> for u32 {
    fn from(value: HexagramId) -> Self {
        u32::from(value.0)
    }
}

impl fmt::Display for HexagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct HexagramDef {
    name: &'static str,
    upper: Trigram,
    lower: Trigram,
}

const fn def(name: &'static str, upper: Trigram, lower: Trigram) -> HexagramDef {
    HexagramDef { name, upper, lower }
}

use Trigram::{Earth, Fire, Heaven, Lake, Mountain, Thunder, Water, Wind};

/// King Wen sequence: canonical name, upper trigram, lower trigram
const KING_WEN: [HexagramDef; 64] = [
    def("乾為天", Heaven, Heaven),
    def("坤為地", Earth, Earth),
    def("水雷屯", Water, Thunder),
    def("山水蒙", Mountain, Water),
    def("水天需", Water, Heaven),
    def("天水訟", Heaven, Water),
    def("地水師", Earth, Water),
    def("水地比", Water, Earth),
    def("風天小畜", Wind, Heaven),
    def("天澤履", Heaven, Lake),
    def("地天泰", Earth, Heaven),
    def("天地否", Heaven, Earth),
    def("天火同人", Heaven, Fire),
    def("火天大有", Fire, Heaven),
    def("地山謙", Earth, Mountain),
    def("雷地豫", Thunder, Earth),
    def("澤雷随", Lake, Thunder),
    def("山風蠱", Mountain, Wind),
    def("地澤臨", Earth, Lake),
    def("風地観", Wind, Earth),
    def("火雷噬嗑", Fire, Thunder),
    def("山火賁", Mountain, Fire),
    def("山地剥", Mountain, Earth),
    def("地雷復", Earth, Thunder),
    def("天雷無妄", Heaven, Thunder),
    def("山天大畜", Mountain, Heaven),
    def("山雷頤", Mountain, Thunder),
    def("澤風大過", Lake, Wind),
    def("坎為水", Water, Water),
    def("離為火", Fire, Fire),
    def("澤山咸", Lake, Mountain),
    def("雷風恒", Thunder, Wind),
    def("天山遯", Heaven, Mountain),
    def("雷天大壮", Thunder, Heaven),
    def("火地晋", Fire, Earth),
    def("地火明夷", Earth, Fire),
    def("風火家人", Wind, Fire),
    def("火澤睽", Fire, Lake),
    def("水山蹇", Water, Mountain),
    def("雷水解", Thunder, Water),
    def("山澤損", Mountain, Lake),
    def("風雷益", Wind, Thunder),
    def("澤天夬", Lake, Heaven),
    def("天風姤", Heaven, Wind),
    def("澤地萃", Lake, Earth),
    def("地風升", Earth, Wind),
    def("澤水困", Lake, Water),
    def("水風井", Water, Wind),
    def("澤火革", Lake, Fire),
    def("火風鼎", Fire, Wind),
    def("震為雷", Thunder, Thunder),
    def("艮為山", Mountain, Mountain),
    def("風山漸", Wind, Mountain),
    def("雷澤帰妹", Thunder, Lake),
    def("雷火豊", Thunder, Fire),
    def("火山旅", Fire, Mountain),
    def("巽為風", Wind, Wind),
    def("兌為澤", Lake, Lake),
    def("風水渙", Wind, Water),
    def("水澤節", Water, Lake),
    def("風澤中孚", Wind, Lake),
    def("雷山小過", Thunder, Mountain),
    def("水火既済", Water, Fire),
    def("火水未済", Fire, Water),
];

/// Variant characters seen in content files, folded to the canonical spelling
const NAME_FOLDS: [(char, char); 10] = [
    ('沢', '澤'),
    ('隨', '随'),
    ('觀', '観'),
    ('歸', '帰'),
    ('晉', '晋'),
    ('濟', '済'),
    ('无', '無'),
    ('蛊', '蠱'),
    ('壯', '壮'),
    ('豐', '豊'),
];

/// Fold variant characters into their canonical form.
///
/// This does not check that the result is a known hexagram name.
#[must_use]
pub fn fold_name_variants(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| {
            NAME_FOLDS
                .iter()
                .find(|(variant, _)| *variant == ch)
                .map_or(ch, |(_, canonical)| *canonical)
        })
        .collect()
}

/// A single hexagram with its fixed name and line pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hexagram {
    pub id: HexagramId,
    pub name: &'static str,
    pub upper: Trigram,
    pub lower: Trigram,
    /// Lines bottom-to-top, `true` for a solid line
    pub lines: [bool; 6],
}

impl Hexagram {
    #[must_use]
    pub fn is_solid(&self, position: LinePosition) -> bool {
        self.lines[position.index()]
    }

    /// Line pattern as a 6-bit mask, bit 0 = bottom line
    #[must_use]
    pub fn mask(&self) -> u8 {
        lines_to_mask(&self.lines)
    }
}

pub(crate) fn lines_to_mask(lines: &[bool; 6]) -> u8 {
    lines
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, solid)| if *solid { acc | (1 << i) } else { acc })
}

/// Immutable table of the 64 hexagrams with name and line-pattern indexes
#[derive(Debug)]
pub struct HexagramTable {
    hexagrams: Vec<Hexagram>,
    by_name: HashMap<&'static str, HexagramId>,
    by_mask: HashMap<u8, HexagramId>,
}

static KING_WEN_TABLE: Lazy<HexagramTable> = Lazy::new(HexagramTable::build);

impl HexagramTable {
    /// The process-wide King Wen table
    #[must_use]
    pub fn king_wen() -> &'static HexagramTable {
        &KING_WEN_TABLE
    }

    fn build() -> Self {
        let mut hexagrams = Vec::with_capacity(KING_WEN.len());
        let mut by_name = HashMap::with_capacity(KING_WEN.len());
        let mut by_mask = HashMap::with_capacity(KING_WEN.len());

        for (idx, def) in KING_WEN.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = HexagramId((idx + 1) as u8);
            let lower = def.lower.lines();
            let upper = def.upper.lines();
            let lines = [lower[0], lower[1], lower[2], upper[0], upper[1], upper[2]];
            let hexagram = Hexagram {
                id,
                name: def.name,
                upper: def.upper,
                lower: def.lower,
                lines,
            };
            by_name.insert(def.name, id);
            by_mask.insert(hexagram.mask(), id);
            hexagrams.push(hexagram);
        }

        Self {
            hexagrams,
            by_name,
            by_mask,
        }
    }

    #[must_use]
    pub fn get(&self, id: HexagramId) -> &Hexagram {
        &self.hexagrams[usize::from(id.get()) - 1]
    }

    #[must_use]
    pub fn name(&self, id: HexagramId) -> &'static str {
        self.get(id).name
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hexagram> {
        self.hexagrams.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hexagrams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hexagrams.is_empty()
    }

    /// Resolve a hexagram name, accepting variant spellings
    pub fn by_name(&self, raw: &str) -> Result<HexagramId> {
        let folded = fold_name_variants(raw);
        self.by_name
            .get(folded.as_str())
            .copied()
            .ok_or_else(|| IchingError::UnknownHexagramName(raw.to_string()))
    }

    /// Canonical spelling of a (possibly variant) hexagram name
    pub fn canonical_name(&self, raw: &str) -> Result<&'static str> {
        self.by_name(raw).map(|id| self.name(id))
    }

    /// Find the hexagram with the given bottom-to-top line pattern
    #[must_use]
    pub fn by_lines(&self, lines: &[bool; 6]) -> Option<HexagramId> {
        self.by_mask.get(&lines_to_mask(lines)).copied()
    }
}
