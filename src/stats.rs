// 📊 Stats Projector - Desk counters derived from the record list
//
//   original_checked_in + new_checked_in == checked_in
//   original_checked_in <= total

use crate::record::AttendeeRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Original roster size (walk-ins excluded)
    pub total: usize,

    pub checked_in: usize,

    /// Checked-in walk-ins
    pub new_checked_in: usize,

    /// Checked-in roster members
    pub original_checked_in: usize,
}

impl Stats {
    pub fn summary(&self) -> String {
        format!(
            "Roster: {} | Checked in: {} ({} on roster, {} walk-ins)",
            self.total, self.checked_in, self.original_checked_in, self.new_checked_in
        )
    }
}

pub fn compute_stats(records: &[AttendeeRecord]) -> Stats {
    let checked_in = records.iter().filter(|r| r.is_checked_in()).count();
    let new_checked_in = records
        .iter()
        .filter(|r| r.is_checked_in() && r.is_walk_in())
        .count();
    let total = records.iter().filter(|r| !r.is_new).count();

    Stats {
        total,
        checked_in,
        new_checked_in,
        original_checked_in: checked_in - new_checked_in,
    }
}
