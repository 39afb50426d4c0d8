use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference minerals the student compares their result against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Mineral {
    Quartz,
    Chalcopyrite,
    Hematite,
    Galena,
}

/// The designated identification for the seeded ore sample.
pub const SAMPLE_MINERAL: Mineral = Mineral::Chalcopyrite;

impl Mineral {
    pub const ALL: [Mineral; 4] = [
        Mineral::Quartz,
        Mineral::Chalcopyrite,
        Mineral::Hematite,
        Mineral::Galena,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mineral::Quartz => "Quartz",
            Mineral::Chalcopyrite => "Chalcopyrite (copper ore)",
            Mineral::Hematite => "Hematite (iron ore)",
            Mineral::Galena => "Galena (lead ore)",
        }
    }

    /// Density shown in the reference table.
    #[must_use]
    pub fn density_label(self) -> &'static str {
        match self {
            Mineral::Quartz => "2.65 g/cm³",
            Mineral::Chalcopyrite => "4.1 - 4.3 g/cm³",
            Mineral::Hematite => "5.26 g/cm³",
            Mineral::Galena => "7.58 g/cm³",
        }
    }
}

impl fmt::Display for Mineral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
