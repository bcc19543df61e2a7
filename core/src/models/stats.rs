/// Figures shown next to the usage calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadingStats {
    pub days_used: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_notes: usize,
    /// Pages of the open document per day of use; `None` without a document
    pub avg_pages_per_day: Option<usize>,
}
