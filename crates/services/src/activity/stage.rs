use std::fmt;

/// One of the ten ordered steps of the guided activity.
///
/// Transitions are strictly forward; there is no way back. Completion is
/// tracked separately from the counter — a session at [`Stage::Report`]
/// is complete exactly when its record has been frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Equipment,
    Procedure,
    Feedback,
    Safety,
    DataRequest,
    Density,
    MineralId,
    Justification,
    Labeling,
    Report,
}

impl Stage {
    pub const TOTAL: u8 = 10;

    /// 1-based position shown by progress bars.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Stage::Equipment => 1,
            Stage::Procedure => 2,
            Stage::Feedback => 3,
            Stage::Safety => 4,
            Stage::DataRequest => 5,
            Stage::Density => 6,
            Stage::MineralId => 7,
            Stage::Justification => 8,
            Stage::Labeling => 9,
            Stage::Report => 10,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Stage::Equipment => "Inventory planning",
            Stage::Procedure => "Propose your procedure",
            Stage::Feedback => "Assistant feedback",
            Stage::Safety => "Safety check",
            Stage::DataRequest => "Data requests",
            Stage::Density => "Calculate the density",
            Stage::MineralId => "Interpret the data",
            Stage::Justification => "Justify your conclusion",
            Stage::Labeling => "Labeling and storage",
            Stage::Report => "Report summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_run_one_through_ten() {
        assert_eq!(Stage::Equipment.number(), 1);
        assert_eq!(Stage::Report.number(), Stage::TOTAL);
    }
}
