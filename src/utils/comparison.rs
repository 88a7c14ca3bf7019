//! Utilities to compare custom types
//!
//! These can be used to sort results, e.g. with `slice::sort_by`

use std::cmp::Ordering;

use crate::task::Task;

/// Higher priorities first
pub fn compare_tasks_by_priority(left: &&Task, right: &&Task) -> Ordering {
    Ord::cmp(&right.priority(), &left.priority())
}

