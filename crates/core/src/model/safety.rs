use serde::{Deserialize, Serialize};
use std::fmt;

/// Personal protective equipment offered by the safety check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Ppe {
    LatexGloves,
    SafetyGoggles,
    LabCoat,
    DustMask,
}

impl Ppe {
    pub const ALL: [Ppe; 4] = [
        Ppe::LatexGloves,
        Ppe::SafetyGoggles,
        Ppe::LabCoat,
        Ppe::DustMask,
    ];

    /// Goggles are the one item indispensable for nearly any procedure.
    #[must_use]
    pub fn is_indispensable(self) -> bool {
        matches!(self, Ppe::SafetyGoggles)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Ppe::LatexGloves => "Latex gloves",
            Ppe::SafetyGoggles => "Safety goggles",
            Ppe::LabCoat => "Lab coat",
            Ppe::DustMask => "Dust mask",
        }
    }
}

impl fmt::Display for Ppe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The student's safety answer together with its grading.
///
/// A wrong answer never blocks the activity; it only costs points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyCheck {
    answer: Ppe,
    correct: bool,
}

impl SafetyCheck {
    /// Records an answer, grading it on the spot.
    #[must_use]
    pub fn record(answer: Ppe) -> Self {
        Self {
            answer,
            correct: answer.is_indispensable(),
        }
    }

    #[must_use]
    pub fn answer(&self) -> Ppe {
        self.answer
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_goggles_grade_correct() {
        assert!(SafetyCheck::record(Ppe::SafetyGoggles).is_correct());
        assert!(!SafetyCheck::record(Ppe::LatexGloves).is_correct());
        assert!(!SafetyCheck::record(Ppe::LabCoat).is_correct());
        assert!(!SafetyCheck::record(Ppe::DustMask).is_correct());
    }
}
