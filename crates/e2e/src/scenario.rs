//! Declarative YAML scenario definitions

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name; also names the trace segment file.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Skip without executing. Counted separately in the suite result.
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub skip_reason: Option<String>,

    /// Steps executed in order; the scenario stops on the first failure.
    pub steps: Vec<Step>,
}

/// A single step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Open the board UI and wait until the expected number of cards is
    /// rendered. `expect_tasks` defaults to the fixture's task count.
    Navigate {
        #[serde(default = "default_path")]
        path: String,
        #[serde(default)]
        expect_tasks: Option<usize>,
    },

    /// Drag a card onto a visible text label (a column header, another
    /// card, or any other element) and release. `via` labels are hovered
    /// in order before the release.
    DragTo {
        task: String,
        target: String,
        #[serde(default)]
        via: Vec<String>,
    },

    /// Press on a card, drift just below it and never release.
    DragOntoSelf {
        task: String,
        #[serde(default = "default_self_offset")]
        dy: f64,
    },

    /// Reload the page.
    Reload {},

    /// Compare every rendered card label against `tasks`. Sorted set
    /// compare by default; `ordered: true` demands the literal sequence.
    AssertTasks {
        tasks: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },

    /// Assert a card label is rendered exactly `count` times.
    AssertTaskCount { task: String, count: usize },

    /// Assert a card is listed under a column container client-side.
    AssertColumnContains { column: String, task: String },

    /// Assert the backend's current state lists the task under the column.
    AssertServerColumnContains { column: String, task: String },
}

fn default_path() -> String {
    "/".to_string()
}

fn default_self_offset() -> f64 {
    20.0
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::ScenarioParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load every scenario under `dir`, in file-name order so numbered
    /// files fix the suite order.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_drag_scenario() {
        let yaml = r#"
name: drag-cross-column
description: A card dragged onto another column migrates there.
tags:
  - dnd
steps:
  - action: navigate
  - action: drag_to
    task: Test application
    target: In Review
  - action: assert_tasks
    ordered: true
    tasks:
      - Deploy application
      - Build Application
      - Test application
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "drag-cross-column");
        assert!(!scenario.skip);
        assert_eq!(scenario.steps.len(), 3);

        match &scenario.steps[0] {
            Step::Navigate { path, expect_tasks } => {
                assert_eq!(path, "/");
                assert_eq!(*expect_tasks, None);
            }
            other => panic!("expected navigate, got {:?}", other),
        }
        match &scenario.steps[1] {
            Step::DragTo { task, target, via } => {
                assert_eq!(task, "Test application");
                assert_eq!(target, "In Review");
                assert!(via.is_empty());
            }
            other => panic!("expected drag_to, got {:?}", other),
        }
    }

    #[test]
    fn self_drag_offset_defaults() {
        let yaml = r#"
name: self-drop
steps:
  - action: drag_onto_self
    task: Test application
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        match &scenario.steps[0] {
            Step::DragOntoSelf { task, dy } => {
                assert_eq!(task, "Test application");
                assert_eq!(*dy, 20.0);
            }
            other => panic!("expected drag_onto_self, got {:?}", other),
        }
    }

    #[test]
    fn skip_flag_round_trips() {
        let yaml = r#"
name: unresolved-case
skip: true
skip_reason: contract not settled
steps:
  - action: navigate
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!(scenario.skip);
        assert_eq!(scenario.skip_reason.as_deref(), Some("contract not settled"));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let yaml = r#"
name: bad
steps:
  - action: teleport
    task: Test application
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn filter_by_tag_matches_exactly() {
        let yaml = r#"
name: tagged
tags: [smoke, dnd]
steps:
  - action: navigate
"#;
        let scenarios = vec![Scenario::from_yaml(yaml).unwrap()];
        assert_eq!(Scenario::filter_by_tag(&scenarios, "dnd").len(), 1);
        assert_eq!(Scenario::filter_by_tag(&scenarios, "persistence").len(), 0);
    }
}
