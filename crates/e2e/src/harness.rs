//! Suite lifecycle
//!
//! One browser and one recorded browsing context span the whole run; every
//! test case gets a freshly seeded backend and a fresh instrumented page.
//! The harness and the per-test page are explicit objects handed down the
//! call chain - no module-level mutable state.
//!
//! Per test case: `SEEDED -> PAGE_LOADED -> (GESTURE*)* -> ASSERTED ->
//! TORN_DOWN`. Seeding before and teardown after each case is what keeps
//! one test from observing another's mutations.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::backend::{BackendClient, BackendConfig};
use crate::board::Board;
use crate::driver::{BrowserBridge, BrowserConfig};
use crate::error::E2eResult;
use crate::overlay;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the application under test.
    pub ui_url: String,

    pub backend: BackendConfig,
    pub browser: BrowserConfig,

    /// Directory per-test trace segments are flushed into.
    pub trace_dir: PathBuf,

    /// Bound on each teardown stage; teardown must never hang the process.
    pub teardown_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ui_url: "http://localhost:3000".to_string(),
            backend: BackendConfig::default(),
            browser: BrowserConfig::default(),
            trace_dir: PathBuf::from("trace"),
            teardown_timeout: Duration::from_secs(10),
        }
    }
}

/// Suite-scoped resources: the driver bridge and the backend client.
pub struct Harness {
    bridge: BrowserBridge,
    backend: BackendClient,
    config: HarnessConfig,
}

impl Harness {
    /// Wait for the backend, spawn the driver, launch the browser and create
    /// the single recorded context shared by every test in the run.
    pub async fn launch(config: HarnessConfig) -> E2eResult<Self> {
        let backend = BackendClient::new(&config.backend)?;
        backend
            .wait_until_ready(config.backend.ready_timeout)
            .await?;

        let bridge = BrowserBridge::spawn().await?;
        bridge.launch(&config.browser).await?;
        bridge.new_context(&config.browser).await?;

        std::fs::create_dir_all(&config.trace_dir)?;

        Ok(Self {
            bridge,
            backend,
            config,
        })
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Seed the canonical fixture and open an instrumented page for one
    /// test case. Seeding completes before the page exists, so the page's
    /// initial fetch can never race the fixture write.
    pub async fn begin_test(&self, name: &str) -> E2eResult<TestPage<'_>> {
        self.backend.seed(&Board::fixture()).await?;
        self.bridge.trace_chunk_start().await?;
        self.bridge.new_page().await?;
        overlay::install(&self.bridge).await?;

        Ok(TestPage {
            harness: self,
            name: name.to_string(),
            finished: false,
        })
    }

    /// Close context and browser through the bridge, bounded.
    pub async fn shutdown(self) -> E2eResult<()> {
        self.bridge.shutdown(self.config.teardown_timeout).await
    }
}

/// One test case's page, valid from seed to teardown.
pub struct TestPage<'a> {
    harness: &'a Harness,
    name: String,
    finished: bool,
}

impl TestPage<'_> {
    pub fn bridge(&self) -> &BrowserBridge {
        &self.harness.bridge
    }

    pub fn backend(&self) -> &BackendClient {
        &self.harness.backend
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = join_url(&self.harness.config.ui_url, path);
        self.bridge().goto(&url).await
    }

    /// Clear client-persisted state, close the page and flush this test's
    /// trace segment. Every stage runs even when an earlier one fails; the
    /// first error is reported.
    pub async fn finish(mut self) -> E2eResult<()> {
        self.finished = true;

        let cleared = self.harness.bridge.clear_storage().await;
        let closed = self.harness.bridge.close_page().await;
        let trace_path = self
            .harness
            .config
            .trace_dir
            .join(format!("{}.zip", self.name));
        let flushed = self.harness.bridge.trace_chunk_stop(&trace_path).await;

        cleared.and(closed).and(flushed)
    }
}

impl Drop for TestPage<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("test page '{}' dropped without finish()", self.name);
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://localhost:3000", "/", "http://localhost:3000/" ; "no_trailing_slash_root")]
    #[test_case("http://localhost:3000/", "/", "http://localhost:3000/" ; "trailing_slash_root")]
    #[test_case("http://localhost:3000", "/board", "http://localhost:3000/board" ; "no_trailing_slash_board")]
    #[test_case("http://localhost:3000/", "board", "http://localhost:3000/board" ; "trailing_slash_board")]
    fn join_url_normalizes_slashes(base: &str, path: &str, expected: &str) {
        assert_eq!(join_url(base, path), expected);
    }
}
