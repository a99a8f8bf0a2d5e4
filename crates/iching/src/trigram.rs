use serde::{Deserialize, Serialize};

/// One of the eight three-line figures that stack into a hexagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigram {
    Heaven,
    Lake,
    Fire,
    Thunder,
    Wind,
    Water,
    Mountain,
    Earth,
}

impl Trigram {
    pub const ALL: [Trigram; 8] = [
        Trigram::Heaven,
        Trigram::Lake,
        Trigram::Fire,
        Trigram::Thunder,
        Trigram::Wind,
        Trigram::Water,
        Trigram::Mountain,
        Trigram::Earth,
    ];

    /// Lines bottom-to-top, `true` for a solid line
    #[must_use]
    pub const fn lines(self) -> [bool; 3] {
        match self {
            Trigram::Heaven => [true, true, true],
            Trigram::Lake => [true, true, false],
            Trigram::Fire => [true, false, true],
            Trigram::Thunder => [true, false, false],
            Trigram::Wind => [false, true, true],
            Trigram::Water => [false, true, false],
            Trigram::Mountain => [false, false, true],
            Trigram::Earth => [false, false, false],
        }
    }

    /// Image character used in hexagram names (天, 澤, 火, ...)
    #[must_use]
    pub const fn image(self) -> &'static str {
        match self {
            Trigram::Heaven => "天",
            Trigram::Lake => "澤",
            Trigram::Fire => "火",
            Trigram::Thunder => "雷",
            Trigram::Wind => "風",
            Trigram::Water => "水",
            Trigram::Mountain => "山",
            Trigram::Earth => "地",
        }
    }
}
