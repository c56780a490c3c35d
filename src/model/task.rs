use std::fmt;

pub const STATUS_UNKNOWN: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    P4,
    #[default]
    Unset,
}

impl Priority {
    pub const ALL: [Priority; 6] = [
        Priority::P0,
        Priority::P1,
        Priority::P2,
        Priority::P3,
        Priority::P4,
        Priority::Unset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
            Priority::Unset => "None",
        }
    }

    /// Sort key: most urgent first, unprioritized last.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::P0 => 0,
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
            Priority::P4 => 4,
            Priority::Unset => 99,
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Priority::P0),
            '1' => Some(Priority::P1),
            '2' => Some(Priority::P2),
            '3' => Some(Priority::P3),
            '4' => Some(Priority::P4),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        *self != Priority::Unset
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A list item normalized for one bot. Built once per fetch and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub assignee_id: Option<String>,
    /// `YYYY-MM-DD` as stored in the list; only the sales digest interprets it.
    pub due: Option<String>,
    pub status: String,
    pub priority: Priority,
    pub notes: Option<String>,
    pub permalink: Option<String>,
}

/// Stable sort by priority rank; equal priorities keep their input order.
pub fn sort_by_priority(items: &mut [TaskRecord]) {
    items.sort_by_key(|item| item.priority.rank());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, priority: Priority) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("Task {id}"),
            assignee_id: None,
            due: None,
            status: "ToDo".into(),
            priority,
            notes: None,
            permalink: None,
        }
    }

    #[test]
    fn unset_priority_ranks_last() {
        for p in Priority::ALL {
            if p.is_set() {
                assert!(p.rank() < Priority::Unset.rank(), "{p} should outrank None");
            }
        }
        assert_eq!(Priority::Unset.rank(), 99);
    }

    #[test]
    fn priority_labels() {
        assert_eq!(Priority::P2.to_string(), "P2");
        assert_eq!(Priority::Unset.to_string(), "None");
        assert_eq!(Priority::default(), Priority::Unset);
        assert_eq!(Priority::from_digit('3'), Some(Priority::P3));
        assert_eq!(Priority::from_digit('5'), None);
    }

    #[test]
    fn sort_is_stable_within_a_priority() {
        let mut items = vec![
            record("a", Priority::P2),
            record("b", Priority::Unset),
            record("c", Priority::P0),
            record("d", Priority::P2),
            record("e", Priority::P0),
        ];
        sort_by_priority(&mut items);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "e", "a", "d", "b"]);
    }

    #[test]
    fn records_compare_by_value() {
        let a = record("a", Priority::P1);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.priority = Priority::Unset;
        assert_ne!(a, b);
    }
}
