//! Ranking of grouped rows

use crate::models::GroupResult;

/// Sort rows by count, largest first; ties keep their incoming order
pub fn rank(mut rows: Vec<GroupResult>) -> Vec<GroupResult> {
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}
