//! Validates the shipped scenario files against the canonical fixture.
//!
//! Catches the cheap mistakes before a browser ever launches: a renamed
//! task that no scenario-referenced label matches, a typo'd column, a
//! duplicated scenario name.

use std::collections::HashSet;
use std::path::PathBuf;

use taskboard_e2e::board::{Board, COLUMNS};
use taskboard_e2e::{Scenario, Step};

fn shipped_scenarios() -> Vec<Scenario> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    Scenario::load_all(&dir).expect("shipped scenarios must parse")
}

#[test]
fn all_scenarios_parse() {
    let scenarios = shipped_scenarios();
    assert_eq!(scenarios.len(), 6);
    for scenario in &scenarios {
        assert!(!scenario.steps.is_empty(), "{} has no steps", scenario.name);
    }
}

#[test]
fn scenario_names_are_unique() {
    let scenarios = shipped_scenarios();
    let names: HashSet<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), scenarios.len());
}

#[test]
fn file_order_fixes_suite_order() {
    let names: Vec<String> = shipped_scenarios().into_iter().map(|s| s.name).collect();
    assert_eq!(names[0], "fetch-initial-board");
    assert_eq!(names[4], "persist-to-server");
}

#[test]
fn dragged_tasks_exist_in_the_fixture() {
    let fixture = Board::fixture();
    for scenario in shipped_scenarios() {
        for step in &scenario.steps {
            let task = match step {
                Step::DragTo { task, .. } => task,
                Step::DragOntoSelf { task, .. } => task,
                Step::AssertTaskCount { task, .. } => task,
                Step::AssertColumnContains { task, .. } => task,
                Step::AssertServerColumnContains { task, .. } => task,
                _ => continue,
            };
            assert_eq!(
                fixture.count_of(task),
                1,
                "{}: '{}' is not a fixture task",
                scenario.name,
                task
            );
        }
    }
}

#[test]
fn asserted_columns_are_board_columns() {
    for scenario in shipped_scenarios() {
        for step in &scenario.steps {
            let column = match step {
                Step::AssertColumnContains { column, .. } => column,
                Step::AssertServerColumnContains { column, .. } => column,
                _ => continue,
            };
            assert!(
                COLUMNS.contains(&column.as_str()),
                "{}: '{}' is not a board column",
                scenario.name,
                column
            );
        }
    }
}

#[test]
fn expected_task_lists_cover_the_fixture() {
    // assert_tasks steps list whole-board expectations; each must be a
    // permutation of the fixture's five task names
    let mut fixture_names = Board::fixture().flattened_names();
    fixture_names.sort();

    for scenario in shipped_scenarios() {
        for step in &scenario.steps {
            if let Step::AssertTasks { tasks, .. } = step {
                let mut expected = tasks.clone();
                expected.sort();
                assert_eq!(
                    expected, fixture_names,
                    "{}: expected task list is not a permutation of the fixture",
                    scenario.name
                );
            }
        }
    }
}

#[test]
fn only_the_unresolved_scenario_is_skipped() {
    let skipped: Vec<String> = shipped_scenarios()
        .into_iter()
        .filter(|s| s.skip)
        .map(|s| s.name)
        .collect();
    assert_eq!(skipped, vec!["hover-then-drop-elsewhere"]);
}
