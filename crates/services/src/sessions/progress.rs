use serde::Serialize;

/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub current_index: usize,
    pub is_complete: bool,
}
