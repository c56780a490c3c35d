use super::task::Priority;

pub const TITLE_KEYS: &[&str] = &["name", "title"];
pub const ASSIGNEE_KEY: &str = "todo_assignee";
pub const DUE_DATE_KEY: &str = "todo_due_date";

/// Column ids and select-option tables of one bot's Slack List.
///
/// Option codes are opaque ids Slack assigns per list, so each bot carries its
/// own tables; the two code spaces never overlap.
#[derive(Debug)]
pub struct ListSchema {
    pub name: &'static str,
    pub status_column: &'static str,
    pub priority_column: &'static str,
    pub notes_column: Option<&'static str>,
    pub statuses: &'static [(&'static str, &'static str)],
    pub priorities: &'static [(&'static str, Priority)],
}

impl ListSchema {
    pub fn status_label(&self, code: &str) -> Option<&'static str> {
        self.statuses
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    pub fn priority_for(&self, code: &str) -> Option<Priority> {
        self.priorities
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, p)| *p)
    }
}

pub static RESEARCH: ListSchema = ListSchema {
    name: "research",
    status_column: "Col093T8A25LG",
    priority_column: "Col08V4T02P5Y",
    notes_column: Some("Col08V5C24K1S"),
    statuses: &[
        ("Opt2AUH34OG", "ToDo"),
        ("Opt62NHHN5C", "ToDo"),
        ("OptHSJVP60E", "In Progress"),
        ("OptHX1KN4IP", "Deprecated"),
        ("OptZHYHCA4A", "Backlog"),
        ("Opt38B8RWRR", "Complete"),
    ],
    priorities: &[
        ("Opt0183CXDH", Priority::P0),
        ("Opt4GBWBKZB", Priority::P1),
        ("OptGESIX7LE", Priority::P2),
        ("Opt24AKKH4V", Priority::P3),
    ],
};

pub static SALES: ListSchema = ListSchema {
    name: "sales",
    status_column: "Col08U80NLD5A",
    priority_column: "Col08U7ZBHRHP",
    notes_column: None,
    statuses: &[
        ("OptSARM6TJH", "Contact Sent"),
        ("OptS0N9KVH3", "Deal"),
        ("OptS4HEYP17", "Future"),
        ("OptS4Z99KWV", "In Convo"),
        ("OptSBP1TU1K", "Meeting"),
        ("OptSCP08V28", "ToDo"),
        ("OptSD8K3H3C", "Workshop"),
        ("OptSDBSH91B", "Intro Made"),
        ("OptSFK2GLEP", "Workshop Complete"),
        ("OptVMB3ZE63", "Dead Lead"),
        ("OptVN8M5XLE", "Deal Complete"),
    ],
    priorities: &[
        ("Opt00QNVMNR", Priority::P0),
        ("Opt4AK2ZJ7N", Priority::P1),
        ("Opt7LDMN1CG", Priority::P2),
        ("OptLCVQGFRH", Priority::P3),
    ],
};
