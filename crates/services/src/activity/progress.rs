/// Aggregated view of activity progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityProgress {
    pub step: u8,
    pub total: u8,
    pub is_complete: bool,
}
