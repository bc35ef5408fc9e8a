//! Error types for the E2E suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Fixture seeding failed: {0}")]
    Fixture(String),

    #[error("Backend not ready after {0} attempts")]
    BackendUnready(usize),

    #[error("Playwright driver not found. Install with: npm install playwright && npx playwright install chromium")]
    DriverNotFound,

    #[error("Driver bridge error: {0}")]
    Bridge(String),

    #[error("Element not found: {0}")]
    Locator(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// Whether this error aborts the remaining suite instead of failing only
    /// the current scenario. Fixture, locator, assertion and timeout errors
    /// are local to one test; a dead driver or a browser that won't launch
    /// is not recoverable by moving on to the next scenario.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::DriverNotFound | E2eError::Bridge(_) | E2eError::Lifecycle(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_test_errors_are_not_fatal() {
        assert!(!E2eError::Fixture("PUT /tasks returned 500".into()).is_fatal());
        assert!(!E2eError::Locator("li:has-text(\"missing\")".into()).is_fatal());
        assert!(!E2eError::Assertion("card duplicated".into()).is_fatal());
        assert!(!E2eError::Timeout("5 rendered cards".into()).is_fatal());
    }

    #[test]
    fn lifecycle_errors_are_fatal() {
        assert!(E2eError::DriverNotFound.is_fatal());
        assert!(E2eError::Bridge("driver exited".into()).is_fatal());
        assert!(E2eError::Lifecycle("browser failed to launch".into()).is_fatal());
    }
}
