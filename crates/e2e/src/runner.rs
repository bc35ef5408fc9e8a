//! Scenario execution and suite orchestration
//!
//! Scenarios run strictly one at a time; isolation comes from the seed
//! before and the teardown after each one, not from synchronization.
//! Per-test errors (fixture, locator, assertion, timeout) fail only their
//! scenario; a dead bridge aborts the remainder of the suite.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::board::Board;
use crate::error::{E2eError, E2eResult};
use crate::gesture::Gestures;
use crate::harness::{Harness, TestPage};
use crate::scenario::{Scenario, Step};
use crate::wait::{poll_until, WaitConfig};

/// Selector for every rendered card; the board renders tasks as list items.
const CARD_SELECTOR: &str = "li";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepOutcome>,
    pub error: Option<String>,
}

impl ScenarioResult {
    fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            skipped: true,
            duration_ms: 0,
            steps: vec![],
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    fn summarize(
        started_at: DateTime<Utc>,
        duration_ms: u64,
        results: Vec<ScenarioResult>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - passed - skipped;
        Self {
            started_at,
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Write the report to `<dir>/results.json`.
    pub fn write_to(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("results.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("results written to: {}", path.display());
        Ok(path)
    }
}

/// Executes scenarios against a launched harness.
pub struct SuiteRunner {
    harness: Harness,
    wait: WaitConfig,
}

impl SuiteRunner {
    pub fn new(harness: Harness, wait: WaitConfig) -> Self {
        Self { harness, wait }
    }

    pub async fn shutdown(self) -> E2eResult<()> {
        self.harness.shutdown().await
    }

    /// Run scenarios in order. Fatal errors propagate and abort the
    /// remainder; everything else is recorded in the suite result.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            if scenario.skip {
                let reason = scenario
                    .skip_reason
                    .as_deref()
                    .map(|r| format!(": {}", r))
                    .unwrap_or_default();
                info!("- {} (skipped{})", scenario.name, reason);
                results.push(ScenarioResult::skipped(&scenario.name));
                continue;
            }

            let result = self.run_scenario(scenario).await?;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = SuiteResult::summarize(started_at, start.elapsed().as_millis() as u64, results);
        info!("");
        info!(
            "Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        Ok(suite)
    }

    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        debug!("running scenario: {}", scenario.name);

        let page = match self.harness.begin_test(&scenario.name).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Ok(ScenarioResult {
                    name: scenario.name.clone(),
                    success: false,
                    skipped: false,
                    duration_ms: start.elapsed().as_millis() as u64,
                    steps: vec![],
                    error: Some(e.to_string()),
                })
            }
        };

        let mut steps = Vec::new();
        let mut failure: Option<String> = None;

        for step in &scenario.steps {
            let step_start = Instant::now();
            let result = self.execute_step(&page, step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => steps.push(StepOutcome {
                    step: step_label(step),
                    success: true,
                    duration_ms,
                    error: None,
                }),
                Err(e) if e.is_fatal() => {
                    let _ = page.finish().await;
                    return Err(e);
                }
                Err(e) => {
                    steps.push(StepOutcome {
                        step: step_label(step),
                        success: false,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    failure = Some(e.to_string());
                    break; // stop on first failure
                }
            }
        }

        if let Err(e) = page.finish().await {
            if e.is_fatal() {
                return Err(e);
            }
            if failure.is_none() {
                failure = Some(format!("teardown failed: {}", e));
            }
        }

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            success: failure.is_none(),
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: failure,
        })
    }

    async fn execute_step(&self, page: &TestPage<'_>, step: &Step) -> E2eResult<()> {
        match step {
            Step::Navigate { path, expect_tasks } => {
                page.goto(path).await?;
                let expected = match expect_tasks {
                    Some(n) => *n,
                    None => Board::fixture().task_count(),
                };
                let bridge = page.bridge();
                poll_until(
                    self.wait,
                    &format!("{} rendered cards", expected),
                    || async move {
                        Ok(bridge.texts(CARD_SELECTOR).await?.len() == expected)
                    },
                )
                .await
            }
            Step::DragTo { task, target, via } => {
                let waypoints: Vec<String> = via.iter().map(|label| text_selector(label)).collect();
                Gestures::new(page.bridge())
                    .drag_via(&card_selector(task), &waypoints, &text_selector(target))
                    .await
            }
            Step::DragOntoSelf { task, dy } => {
                Gestures::new(page.bridge())
                    .hover_below(&card_selector(task), *dy)
                    .await
            }
            Step::Reload {} => page.bridge().reload().await,
            Step::AssertTasks { tasks, ordered } => {
                self.assert_tasks(page, tasks, *ordered).await
            }
            Step::AssertTaskCount { task, count } => {
                self.assert_task_count(page, task, *count).await
            }
            Step::AssertColumnContains { column, task } => {
                self.assert_column_contains(page, column, task).await
            }
            Step::AssertServerColumnContains { column, task } => {
                self.assert_server_column_contains(page, column, task).await
            }
        }
    }

    async fn assert_tasks(
        &self,
        page: &TestPage<'_>,
        expected: &[String],
        ordered: bool,
    ) -> E2eResult<()> {
        let bridge = page.bridge();
        let result = poll_until(self.wait, "rendered cards to match", || async move {
            Ok(tasks_match(
                &bridge.texts(CARD_SELECTOR).await?,
                expected,
                ordered,
            ))
        })
        .await;

        match result {
            Err(E2eError::Timeout(_)) => {
                let actual = page.bridge().texts(CARD_SELECTOR).await?;
                Err(E2eError::Assertion(format!(
                    "rendered cards do not match the expected tasks{}: expected {:?}, got {:?}",
                    if ordered { " (in order)" } else { "" },
                    expected,
                    actual
                )))
            }
            other => other,
        }
    }

    async fn assert_task_count(
        &self,
        page: &TestPage<'_>,
        task: &str,
        count: usize,
    ) -> E2eResult<()> {
        let bridge = page.bridge();
        let result = poll_until(
            self.wait,
            &format!("{} occurrence(s) of '{}'", count, task),
            || async move { Ok(occurrences(&bridge.texts(CARD_SELECTOR).await?, task) == count) },
        )
        .await;

        match result {
            Err(E2eError::Timeout(_)) => {
                let found = occurrences(&page.bridge().texts(CARD_SELECTOR).await?, task);
                let message = if found > count {
                    format!(
                        "duplicate cards rendered for '{}': found {}, expected {}",
                        task, found, count
                    )
                } else {
                    format!(
                        "card '{}' went missing: found {}, expected {}",
                        task, found, count
                    )
                };
                Err(E2eError::Assertion(message))
            }
            other => other,
        }
    }

    async fn assert_column_contains(
        &self,
        page: &TestPage<'_>,
        column: &str,
        task: &str,
    ) -> E2eResult<()> {
        let container = column_container_selector(column);
        let container = container.as_str();
        let bridge = page.bridge();
        let result = poll_until(
            self.wait,
            &format!("'{}' listed under '{}'", task, column),
            || async move {
                // the container itself may not be rendered yet
                match bridge.texts_within(container, CARD_SELECTOR).await {
                    Ok(texts) => Ok(texts.iter().any(|t| t == task)),
                    Err(E2eError::Locator(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            },
        )
        .await;

        match result {
            Err(E2eError::Timeout(_)) => Err(E2eError::Assertion(format!(
                "task changes were not visible on the client: '{}' not listed under '{}'",
                task, column
            ))),
            other => other,
        }
    }

    async fn assert_server_column_contains(
        &self,
        page: &TestPage<'_>,
        column: &str,
        task: &str,
    ) -> E2eResult<()> {
        let backend = page.backend();
        let result = poll_until(
            self.wait,
            &format!("backend '{}' to contain '{}'", column, task),
            || async move {
                let board = backend.fetch().await?;
                Ok(board
                    .tasks_in(column)
                    .map(|tasks| tasks.iter().any(|t| t.name == task))
                    .unwrap_or(false))
            },
        )
        .await;

        match result {
            Err(E2eError::Timeout(_)) => Err(E2eError::Assertion(format!(
                "task changes were not persisted to the server: '{}' not in '{}'",
                task, column
            ))),
            other => other,
        }
    }
}

/// Playwright selector for a card by its label.
fn card_selector(task: &str) -> String {
    format!("li:has-text(\"{}\")", escape_quotes(task))
}

/// Playwright text selector for any visible label.
fn text_selector(label: &str) -> String {
    format!("text={}", label)
}

/// The innermost `div` that carries the column's name and holds cards.
/// Matched with `.last()` driver-side, so a page-level wrapper that happens
/// to contain the text does not win.
fn column_container_selector(column: &str) -> String {
    format!("div:has-text(\"{}\"):has(li)", escape_quotes(column))
}

fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn tasks_match(actual: &[String], expected: &[String], ordered: bool) -> bool {
    if ordered {
        actual == expected
    } else {
        let mut actual: Vec<&String> = actual.iter().collect();
        let mut expected: Vec<&String> = expected.iter().collect();
        actual.sort();
        expected.sort();
        actual == expected
    }
}

fn occurrences(actual: &[String], task: &str) -> usize {
    actual.iter().filter(|t| t.as_str() == task).count()
}

fn step_label(step: &Step) -> String {
    match step {
        Step::Navigate { path, .. } => format!("navigate:{}", path),
        Step::DragTo { task, target, via } if via.is_empty() => {
            format!("drag:{} -> {}", task, target)
        }
        Step::DragTo { task, target, via } => {
            format!("drag:{} -> {} (via {})", task, target, via.join(", "))
        }
        Step::DragOntoSelf { task, .. } => format!("self-drag:{}", task),
        Step::Reload {} => "reload".to_string(),
        Step::AssertTasks { ordered: true, .. } => "assert-tasks:ordered".to_string(),
        Step::AssertTasks { .. } => "assert-tasks:set".to_string(),
        Step::AssertTaskCount { task, count } => format!("assert-count:{}={}", task, count),
        Step::AssertColumnContains { column, task } => {
            format!("assert-column:{}:{}", column, task)
        }
        Step::AssertServerColumnContains { column, task } => {
            format!("assert-server:{}:{}", column, task)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_compare_ignores_order() {
        let actual = strings(&["Write specs", "Deploy application"]);
        let expected = strings(&["Deploy application", "Write specs"]);
        assert!(tasks_match(&actual, &expected, false));
        assert!(!tasks_match(&actual, &expected, true));
    }

    #[test]
    fn set_compare_catches_duplicates() {
        let actual = strings(&["Test application", "Test application"]);
        let expected = strings(&["Test application"]);
        assert!(!tasks_match(&actual, &expected, false));
    }

    #[test_case(&["a", "b", "a"], "a", 2)]
    #[test_case(&["a", "b"], "c", 0)]
    #[test_case(&["Test application"], "Test application", 1)]
    fn occurrence_counting(actual: &[&str], task: &str, expected: usize) {
        assert_eq!(occurrences(&strings(actual), task), expected);
    }

    #[test]
    fn selectors_quote_labels() {
        assert_eq!(
            card_selector("Test application"),
            "li:has-text(\"Test application\")"
        );
        assert_eq!(text_selector("In Review"), "text=In Review");
        assert_eq!(
            column_container_selector("In Review"),
            "div:has-text(\"In Review\"):has(li)"
        );
        assert_eq!(card_selector("say \"hi\""), "li:has-text(\"say \\\"hi\\\"\")");
    }

    #[test]
    fn step_labels_name_the_work() {
        assert_eq!(
            step_label(&Step::DragTo {
                task: "Test application".into(),
                target: "In Review".into(),
                via: vec![],
            }),
            "drag:Test application -> In Review"
        );
        assert_eq!(
            step_label(&Step::AssertTaskCount {
                task: "Test application".into(),
                count: 1,
            }),
            "assert-count:Test application=1"
        );
    }

    #[test]
    fn summarize_accounts_for_skips() {
        let results = vec![
            ScenarioResult {
                name: "a".into(),
                success: true,
                skipped: false,
                duration_ms: 10,
                steps: vec![],
                error: None,
            },
            ScenarioResult {
                name: "b".into(),
                success: false,
                skipped: false,
                duration_ms: 10,
                steps: vec![],
                error: Some("boom".into()),
            },
            ScenarioResult::skipped("c"),
        ];
        let suite = SuiteResult::summarize(Utc::now(), 20, results);
        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert_eq!(suite.skipped, 1);
    }
}
