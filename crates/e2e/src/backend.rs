//! Backend task-store client - fixture seeding and server-state reads

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::board::Board;
use crate::error::{E2eError, E2eResult};

/// Configuration for the backend task store the application syncs with.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the task API.
    pub api_url: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// How long to wait for the backend to come up before the suite starts.
    pub ready_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            request_timeout: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the task collection endpoint.
pub struct BackendClient {
    client: reqwest::Client,
    tasks_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            tasks_url: format!("{}/tasks", config.api_url.trim_end_matches('/')),
        })
    }

    /// True when the backend answers at all, whatever the status. Used to
    /// decide whether the suite can run on this machine.
    pub async fn probe(&self) -> bool {
        self.client.get(&self.tasks_url).send().await.is_ok()
    }

    /// Poll the task collection until the backend responds with a success
    /// status. Connection refused is expected while the stack is starting.
    pub async fn wait_until_ready(&self, timeout: Duration) -> E2eResult<()> {
        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match self.client.get(&self.tasks_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("backend readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for backend at {}...", self.tasks_url);
                    }
                    if !e.is_connect() {
                        warn!("backend readiness check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::BackendUnready(attempts))
    }

    /// Full-replace write of the board. Must complete before the page under
    /// test issues its initial fetch; a failed write aborts the test rather
    /// than letting it run against stale state.
    pub async fn seed(&self, board: &Board) -> E2eResult<()> {
        let resp = self
            .client
            .put(&self.tasks_url)
            .json(board)
            .send()
            .await
            .map_err(|e| E2eError::Fixture(format!("PUT {} failed: {}", self.tasks_url, e)))?;

        if !resp.status().is_success() {
            return Err(E2eError::Fixture(format!(
                "PUT {} returned {}",
                self.tasks_url,
                resp.status()
            )));
        }
        Ok(())
    }

    /// Current server-side board, for persistence assertions.
    pub async fn fetch(&self) -> E2eResult<Board> {
        let resp = self
            .client
            .get(&self.tasks_url)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_url_joins_cleanly() {
        let config = BackendConfig {
            api_url: "http://localhost:3001/".to_string(),
            ..Default::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.tasks_url, "http://localhost:3001/tasks");
    }
}
