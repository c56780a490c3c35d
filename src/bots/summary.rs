use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::model::task::{Priority, TaskRecord};

/// Item count per status label, sorted by label.
pub fn status_distribution(items: &[TaskRecord]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.status.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Item count per priority, most urgent first, zero counts omitted.
pub fn priority_distribution(items: &[TaskRecord]) -> Vec<(Priority, usize)> {
    let mut counts: HashMap<Priority, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.priority).or_insert(0) += 1;
    }
    Priority::ALL
        .into_iter()
        .filter_map(|p| counts.get(&p).map(|n| (p, *n)))
        .collect()
}

pub fn render_status_distribution(out: &mut String, items: &[TaskRecord]) {
    let _ = writeln!(out, "Status distribution:");
    for (status, count) in status_distribution(items) {
        let _ = writeln!(out, "  {status}: {count}");
    }
}

pub fn render_priority_distribution(out: &mut String, heading: &str, items: &[TaskRecord]) {
    let _ = writeln!(out, "{heading}");
    for (priority, count) in priority_distribution(items) {
        let _ = writeln!(out, "  {priority}: {count}");
    }
}
