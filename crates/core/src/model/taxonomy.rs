use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaxonomyError {
    #[error("unknown quiz type: {0}")]
    UnknownQuizType(String),

    #[error("unknown DISC trait: {0}")]
    UnknownTrait(String),

    #[error("unknown DISC slot: {0}")]
    UnknownSlot(String),
}

//
// ─── QUIZ TYPE ─────────────────────────────────────────────────────────────────
//

/// The two questionnaire families offered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuizType {
    Mbti,
    Disc,
}

impl QuizType {
    /// Lower-case needle searched for in category names.
    #[must_use]
    pub fn category_pattern(self) -> &'static str {
        match self {
            QuizType::Mbti => "mbti",
            QuizType::Disc => "disc",
        }
    }

    /// Returns true if the category name belongs to this quiz type.
    #[must_use]
    pub fn matches_category(self, name: &str) -> bool {
        name.to_lowercase().contains(self.category_pattern())
    }
}

impl fmt::Display for QuizType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizType::Mbti => f.write_str("MBTI"),
            QuizType::Disc => f.write_str("DISC"),
        }
    }
}

impl FromStr for QuizType {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MBTI" => Ok(QuizType::Mbti),
            "DISC" => Ok(QuizType::Disc),
            _ => Err(TaxonomyError::UnknownQuizType(s.to_string())),
        }
    }
}

//
// ─── DISC ──────────────────────────────────────────────────────────────────────
//

/// One of the four DISC behavioral traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiscTrait {
    #[serde(rename = "D")]
    Dominance,
    #[serde(rename = "I")]
    Influence,
    #[serde(rename = "S")]
    Steadiness,
    #[serde(rename = "C")]
    Conscientiousness,
}

impl DiscTrait {
    pub const ALL: [DiscTrait; 4] = [
        DiscTrait::Dominance,
        DiscTrait::Influence,
        DiscTrait::Steadiness,
        DiscTrait::Conscientiousness,
    ];

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            DiscTrait::Dominance => 'D',
            DiscTrait::Influence => 'I',
            DiscTrait::Steadiness => 'S',
            DiscTrait::Conscientiousness => 'C',
        }
    }
}

impl fmt::Display for DiscTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for DiscTrait {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(DiscTrait::Dominance),
            "I" => Ok(DiscTrait::Influence),
            "S" => Ok(DiscTrait::Steadiness),
            "C" => Ok(DiscTrait::Conscientiousness),
            _ => Err(TaxonomyError::UnknownTrait(s.to_string())),
        }
    }
}

/// Which side of a DISC forced-choice item a trait is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscSlot {
    Most,
    Least,
}

impl DiscSlot {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            DiscSlot::Most => DiscSlot::Least,
            DiscSlot::Least => DiscSlot::Most,
        }
    }
}

impl FromStr for DiscSlot {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "most" | "m" | "+" => Ok(DiscSlot::Most),
            "least" | "l" | "-" => Ok(DiscSlot::Least),
            _ => Err(TaxonomyError::UnknownSlot(s.to_string())),
        }
    }
}

//
// ─── MBTI ──────────────────────────────────────────────────────────────────────
//

/// One of the four opposing MBTI axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MbtiPair {
    #[serde(rename = "E/I")]
    EI,
    #[serde(rename = "S/N")]
    SN,
    #[serde(rename = "T/F")]
    TF,
    #[serde(rename = "J/P")]
    JP,
}

impl MbtiPair {
    /// Maps a single dimension letter onto the axis it belongs to.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'E' | 'I' => Some(MbtiPair::EI),
            'S' | 'N' => Some(MbtiPair::SN),
            'T' | 'F' => Some(MbtiPair::TF),
            'J' | 'P' => Some(MbtiPair::JP),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MbtiPair::EI => "E/I",
            MbtiPair::SN => "S/N",
            MbtiPair::TF => "T/F",
            MbtiPair::JP => "J/P",
        }
    }
}

impl fmt::Display for MbtiPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_letter_maps_to_its_axis() {
        let table = [
            ('E', MbtiPair::EI),
            ('I', MbtiPair::EI),
            ('S', MbtiPair::SN),
            ('N', MbtiPair::SN),
            ('T', MbtiPair::TF),
            ('F', MbtiPair::TF),
            ('J', MbtiPair::JP),
            ('p', MbtiPair::JP),
        ];
        for (letter, pair) in table {
            assert_eq!(MbtiPair::from_letter(letter), Some(pair), "letter {letter}");
        }
        assert_eq!(MbtiPair::from_letter('X'), None);
    }

    #[test]
    fn category_match_is_case_insensitive() {
        assert!(QuizType::Mbti.matches_category("MBTI Personality"));
        assert!(QuizType::Disc.matches_category("Behavioral disc profile"));
        assert!(!QuizType::Disc.matches_category("MBTI"));
    }

    #[test]
    fn disc_traits_use_single_letters_on_the_wire() {
        let json = serde_json::to_string(&DiscTrait::Steadiness).unwrap();
        assert_eq!(json, "\"S\"");
        let parsed: DiscTrait = serde_json::from_str("\"C\"").unwrap();
        assert_eq!(parsed, DiscTrait::Conscientiousness);
        assert_eq!("i".parse::<DiscTrait>().unwrap(), DiscTrait::Influence);
    }

    #[test]
    fn quiz_type_round_trips_through_text() {
        assert_eq!("mbti".parse::<QuizType>().unwrap(), QuizType::Mbti);
        assert_eq!(QuizType::Disc.to_string(), "DISC");
        assert!("enneagram".parse::<QuizType>().is_err());
    }

    #[test]
    fn slots_are_opposites() {
        assert_eq!(DiscSlot::Most.opposite(), DiscSlot::Least);
        assert_eq!("least".parse::<DiscSlot>().unwrap(), DiscSlot::Least);
    }
}
