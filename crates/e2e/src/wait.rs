//! Poll-until-condition readiness helpers
//!
//! Fixed settle-delays after a gesture are the classic source of drag-suite
//! flakiness. Every wait in this crate polls an observable condition with a
//! bounded timeout instead.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{E2eError, E2eResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Poll `condition` until it holds or the timeout elapses. `what` names the
/// awaited condition in the timeout error. Errors from the condition itself
/// propagate immediately.
pub async fn poll_until<F, Fut>(config: WaitConfig, what: &str, mut condition: F) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let start = tokio::time::Instant::now();
    loop {
        if condition().await? {
            return Ok(());
        }
        if start.elapsed() >= config.timeout {
            return Err(E2eError::Timeout(what.to_string()));
        }
        sleep(config.interval).await;
    }
}
