use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One item from the laboratory inventory the student plans with.
///
/// Four items are genuinely needed to measure mass and volume by
/// displacement; the rest are distractors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Equipment {
    Balance,
    GraduatedCylinder,
    Water,
    OreSample,
    Beaker,
    ErlenmeyerFlask,
    Thermometer,
    BunsenBurner,
}

impl Equipment {
    /// Every item offered by the inventory screen.
    pub const ALL: [Equipment; 8] = [
        Equipment::Balance,
        Equipment::GraduatedCylinder,
        Equipment::Water,
        Equipment::OreSample,
        Equipment::Beaker,
        Equipment::ErlenmeyerFlask,
        Equipment::Thermometer,
        Equipment::BunsenBurner,
    ];

    /// Whether the item is indispensable for the displacement procedure.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Equipment::Balance
                | Equipment::GraduatedCylinder
                | Equipment::Water
                | Equipment::OreSample
        )
    }

    /// The exact set a correct plan must select.
    #[must_use]
    pub fn required_set() -> BTreeSet<Equipment> {
        Self::ALL.into_iter().filter(|e| e.is_required()).collect()
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Equipment::Balance => "Balance",
            Equipment::GraduatedCylinder => "Graduated cylinder",
            Equipment::Water => "Water",
            Equipment::OreSample => "Ore sample",
            Equipment::Beaker => "Beaker",
            Equipment::ErlenmeyerFlask => "Erlenmeyer flask",
            Equipment::Thermometer => "Thermometer",
            Equipment::BunsenBurner => "Bunsen burner",
        }
    }
}

impl fmt::Display for Equipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
