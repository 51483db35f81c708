//! Text → mouth-shape (viseme) heuristic.
//!
//! Only the trailing character of the transcript is inspected. This is a cheap
//! proxy for lip-sync, not phonetic alignment.
//!
//! ## Unicode handling
//!
//! The unit inspected is the final Unicode scalar value (`char`). It is
//! uppercased with [`char::to_uppercase`]; when that produces more than one
//! character (e.g. `ß` → `SS`) the result is [`MouthShape::Normal`]. A trailing
//! combining mark (`"cafe\u{301}"`) is looked up on its own and therefore maps to
//! `Normal`. Astral characters are never split, and none of them are in the table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete mouth position sent to viewers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouthShape {
    A,
    E,
    I,
    O,
    U,
    M,
    #[default]
    Normal,
}

impl MouthShape {
    /// Every shape the mapper can produce.
    pub const ALL: [MouthShape; 7] = [
        MouthShape::A,
        MouthShape::E,
        MouthShape::I,
        MouthShape::O,
        MouthShape::U,
        MouthShape::M,
        MouthShape::Normal,
    ];

    /// Wire code, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::E => "E",
            Self::I => "I",
            Self::O => "O",
            Self::U => "U",
            Self::M => "M",
            Self::Normal => "Normal",
        }
    }

    /// Look up a single uppercase character in the phonetic table.
    ///
    /// Consonant entries (`F`, `V`, `S`, `Z`, `L`) map to vowel shapes on purpose;
    /// viewers depend on these exact codes.
    pub fn from_phonetic(c: char) -> Self {
        match c {
            'A' | 'Ä' | 'À' | 'Á' => Self::A,
            'E' | 'É' | 'È' => Self::E,
            'I' | 'Í' | 'Ï' => Self::I,
            'O' | 'Ö' | 'Ó' => Self::O,
            'U' | 'Ü' | 'Ú' => Self::U,
            'M' | 'B' | 'P' => Self::M,
            'F' | 'V' | 'L' => Self::E,
            'S' | 'Z' => Self::I,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for MouthShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive a mouth shape from the trailing character of `text`.
///
/// `None` and the empty string both yield [`MouthShape::Normal`].
pub fn mouth_shape(text: Option<&str>) -> MouthShape {
    let Some(last) = text.and_then(|t| t.chars().next_back()) else {
        return MouthShape::Normal;
    };

    let mut upper = last.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(c), None) => MouthShape::from_phonetic(c),
        _ => MouthShape::Normal,
    }
}
