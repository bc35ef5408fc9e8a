//! Board data model and the canonical seed fixture
//!
//! The backend's wire format is a JSON object keyed by column name, each
//! value an ordered task list. Column order is significant: the UI renders
//! columns left to right in board order, which fixes the order of the
//! flattened card list the assertions read back.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Column names in board order.
pub const COLUMNS: [&str; 4] = ["Backlog", "In Progress", "In Review", "Done"];

/// A single card on the board. `id` is unique across the whole board.
/// The backend is only required to echo `name`, so `id` tolerates absence
/// on the read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

impl Task {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Ordered mapping from column name to tasks.
///
/// Serialized as a JSON object in column order; deserialized in the order
/// the backend sends. A task belongs to exactly one column at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    columns: Vec<(String, Vec<Task>)>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical board every scenario starts from: five tasks across
    /// the four columns.
    pub fn fixture() -> Self {
        let mut board = Board::new();
        board.push_column("Backlog", vec![Task::new("task5", "Deploy application")]);
        board.push_column("In Progress", vec![Task::new("task4", "Test application")]);
        board.push_column("In Review", vec![Task::new("task6", "Build Application")]);
        board.push_column(
            "Done",
            vec![
                Task::new("task2", "Design mockups"),
                Task::new("task1", "Write specs"),
            ],
        );
        board
    }

    pub fn push_column(&mut self, name: &str, tasks: Vec<Task>) {
        self.columns.push((name.to_string(), tasks));
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Task])> {
        self.columns
            .iter()
            .map(|(name, tasks)| (name.as_str(), tasks.as_slice()))
    }

    /// Tasks under `column`, or None when the board has no such column.
    pub fn tasks_in(&self, column: &str) -> Option<&[Task]> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, tasks)| tasks.as_slice())
    }

    /// The column a task name currently lives in.
    pub fn column_of(&self, task_name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(_, tasks)| tasks.iter().any(|t| t.name == task_name))
            .map(|(name, _)| name.as_str())
    }

    /// How many cards carry this name, across all columns.
    pub fn count_of(&self, task_name: &str) -> usize {
        self.columns
            .iter()
            .flat_map(|(_, tasks)| tasks.iter())
            .filter(|t| t.name == task_name)
            .count()
    }

    /// Task names in board order (column order, then card order).
    pub fn flattened_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|(_, tasks)| tasks.iter().map(|t| t.name.clone()))
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|(_, tasks)| tasks.len()).sum()
    }

    /// Ids that appear more than once. Empty on a well-formed board.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.columns
            .iter()
            .flat_map(|(_, tasks)| tasks.iter())
            .filter_map(|t| (!seen.insert(t.id.as_str())).then_some(t.id.as_str()))
            .collect()
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, tasks) in &self.columns {
            map.serialize_entry(name, tasks)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoardVisitor;

        impl<'de> Visitor<'de> for BoardVisitor {
            type Value = Board;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from column name to task list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Board, A::Error> {
                let mut board = Board::new();
                while let Some((name, tasks)) = map.next_entry::<String, Vec<Task>>()? {
                    board.columns.push((name, tasks));
                }
                Ok(board)
            }
        }

        deserializer.deserialize_map(BoardVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn fixture_shape() {
        let board = Board::fixture();
        assert_eq!(board.columns().count(), COLUMNS.len());
        assert_eq!(board.task_count(), 5);
        assert!(board.duplicate_ids().is_empty());

        let names: Vec<&str> = board.columns().map(|(name, _)| name).collect();
        assert_eq!(names, COLUMNS);
    }

    #[test_case("Deploy application", "Backlog")]
    #[test_case("Test application", "In Progress")]
    #[test_case("Build Application", "In Review")]
    #[test_case("Write specs", "Done")]
    fn fixture_membership(task: &str, column: &str) {
        assert_eq!(Board::fixture().column_of(task), Some(column));
    }

    #[test]
    fn fixture_flattened_order() {
        assert_eq!(
            Board::fixture().flattened_names(),
            vec![
                "Deploy application",
                "Test application",
                "Build Application",
                "Design mockups",
                "Write specs",
            ]
        );
    }

    #[test]
    fn count_of_absent_task_is_zero() {
        assert_eq!(Board::fixture().count_of("Ship to production"), 0);
        assert_eq!(Board::fixture().count_of("Test application"), 1);
    }

    #[test]
    fn wire_format_is_a_column_keyed_object() {
        let value = serde_json::to_value(Board::fixture()).unwrap();
        assert_eq!(value["Backlog"][0]["id"], "task5");
        assert_eq!(value["Backlog"][0]["name"], "Deploy application");
        assert_eq!(value["Done"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn deserializes_backend_response() {
        let json = r#"{
            "Backlog": [],
            "In Progress": [],
            "In Review": [{"id": "task4", "name": "Test application"}],
            "Done": []
        }"#;
        let board: Board = serde_json::from_str(json).unwrap();
        assert_eq!(board.column_of("Test application"), Some("In Review"));
        assert_eq!(board.tasks_in("Backlog"), Some(&[][..]));
        assert_eq!(board.tasks_in("Doing"), None);
    }

    #[test]
    fn task_id_is_optional_on_the_read_path() {
        let board: Board = serde_json::from_str(r#"{"Done": [{"name": "Write specs"}]}"#).unwrap();
        assert_eq!(board.count_of("Write specs"), 1);
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let mut board = Board::new();
        board.push_column("Backlog", vec![Task::new("t1", "A"), Task::new("t1", "B")]);
        assert_eq!(board.duplicate_ids(), vec!["t1"]);
    }
}
