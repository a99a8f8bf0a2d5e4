use crate::error::IchingError;
use crate::hexagram::HexagramId;
use crate::line::{LinePosition, LineRef};
use crate::transform::TransformTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One character of a path signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// `J`: stay in the hexagram, move one line up
    Advance,
    /// `H`: change the current line, stay on it
    Transform,
}

impl Move {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Move::Advance => 'J',
            Move::Transform => 'H',
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            'J' => Some(Move::Advance),
            'H' => Some(Move::Transform),
            _ => None,
        }
    }
}

/// Three-move path, one of exactly eight values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSignature(u8);

impl PathSignature {
    /// Canonical enumeration order: JJJ, JJH, JHJ, JHH, HJJ, HJH, HHJ, HHH
    pub const ALL: [PathSignature; 8] = [
        PathSignature(0),
        PathSignature(1),
        PathSignature(2),
        PathSignature(3),
        PathSignature(4),
        PathSignature(5),
        PathSignature(6),
        PathSignature(7),
    ];

    #[must_use]
    pub fn moves(self) -> [Move; 3] {
        let at = |shift: u8| {
            if self.0 & (1 << shift) == 0 {
                Move::Advance
            } else {
                Move::Transform
            }
        };
        [at(2), at(1), at(0)]
    }

    #[must_use]
    pub fn from_moves(moves: [Move; 3]) -> Self {
        let bits = moves
            .iter()
            .fold(0u8, |acc, m| (acc << 1) | u8::from(*m == Move::Transform));
        Self(bits)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        const NAMES: [&str; 8] = ["JJJ", "JJH", "JHJ", "JHH", "HJJ", "HJH", "HHJ", "HHH"];
        NAMES[usize::from(self.0)]
    }
}

impl FromStr for PathSignature {
    type Err = IchingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IchingError::InvalidPathSignature(s.to_string());
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() != 3 {
            return Err(invalid());
        }
        let mut moves = [Move::Advance; 3];
        for (slot, ch) in moves.iter_mut().zip(chars) {
            *slot = Move::from_char(ch.to_ascii_uppercase()).ok_or_else(invalid)?;
        }
        Ok(Self::from_moves(moves))
    }
}

impl fmt::Display for PathSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PathSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PathSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What a step did to reach its line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Advance,
    Transform,
}

impl From<Move> for Action {
    fn from(value: Move) -> Self {
        match value {
            Move::Advance => Action::Advance,
            Move::Transform => Action::Transform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub hexagram: HexagramId,
    pub line: LinePosition,
    pub action: Action,
}

impl Step {
    #[must_use]
    pub const fn line_ref(&self) -> LineRef {
        LineRef::new(self.hexagram, self.line)
    }
}

/// Walks a path signature over a transform table
#[derive(Debug, Clone, Default)]
pub struct PathWalker {
    transforms: TransformTable,
}

impl PathWalker {
    #[must_use]
    pub fn new(transforms: TransformTable) -> Self {
        Self { transforms }
    }

    #[must_use]
    pub fn transforms(&self) -> &TransformTable {
        &self.transforms
    }

    /// Apply the three moves in order; each step starts where the previous ended
    #[must_use]
    pub fn walk(&self, start: LineRef, signature: PathSignature) -> [Step; 3] {
        let mut hexagram = start.hexagram;
        let mut line = start.position;

        signature.moves().map(|mv| {
            match mv {
                Move::Advance => line = line.advance(),
                Move::Transform => hexagram = self.transforms.transform(hexagram, line),
            }
            Step {
                hexagram,
                line,
                action: mv.into(),
            }
        })
    }

    /// Final line reached by the walk
    #[must_use]
    pub fn destination(&self, start: LineRef, signature: PathSignature) -> LineRef {
        self.walk(start, signature)[2].line_ref()
    }
}
