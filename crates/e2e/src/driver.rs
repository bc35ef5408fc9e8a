//! Playwright browser bridge
//!
//! The browser is driven through a long-lived Node driver process: a
//! self-contained script is staged in a temp directory and spawned with
//! `node`, then spoken to over stdin/stdout with one JSON object per line
//! (`{id, op, params}` requests, `{id, ok, value, error}` replies). Keeping
//! one process alive for the whole run is what lets a single browser and a
//! single recorded browsing context span every test in the suite.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command as TokioCommand};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::gesture::BoundingBox;

/// Browser-side configuration for the suite's single context.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Context timezone; pinned so recorded runs are reproducible.
    pub timezone: String,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory session videos are recorded into.
    pub video_dir: std::path::PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timezone: "Etc/UTC".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            video_dir: std::path::PathBuf::from("videos"),
        }
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

/// Handle to the driver process.
pub struct BrowserBridge {
    child: Child,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    call_timeout: Duration,
    // Keeps the staged driver script alive for the process lifetime.
    _stage_dir: tempfile::TempDir,
}

impl BrowserBridge {
    /// Whether `node` can resolve the Playwright package.
    pub fn available() -> bool {
        std::process::Command::new("node")
            .args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Stage the driver script and spawn the Node process.
    pub async fn spawn() -> E2eResult<Self> {
        if !Self::available() {
            return Err(E2eError::DriverNotFound);
        }

        let stage_dir = tempfile::tempdir()?;
        let script_path = stage_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        debug!("spawning driver: node {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| E2eError::Lifecycle(format!("failed to spawn node driver: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Lifecycle("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Lifecycle("driver stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Lifecycle("driver stderr unavailable".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Reply>(&line) {
                    Ok(reply) => {
                        if let Some(tx) = reader_pending.lock().await.remove(&reply.id) {
                            let _ = tx.send(reply);
                        } else {
                            warn!("driver reply with unknown id {}", reply.id);
                        }
                    }
                    Err(e) => warn!("undecodable driver line ({}): {}", e, line),
                }
            }
            debug!("driver stdout closed");
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("driver: {}", line);
            }
        });

        Ok(Self {
            child,
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            call_timeout: Duration::from_secs(30),
            _stage_dir: stage_dir,
        })
    }

    async fn call(&self, op: &str, params: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let mut line = serde_json::to_string(&Request { id, op, params })?;
        line.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| E2eError::Bridge(format!("driver write failed: {}", e)))?;
            stdin
                .flush()
                .await
                .map_err(|e| E2eError::Bridge(format!("driver flush failed: {}", e)))?;
        }

        let reply = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(E2eError::Bridge(format!(
                    "driver exited while handling '{}'",
                    op
                )))
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(E2eError::Timeout(format!("driver reply to '{}'", op)));
            }
        };

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Bridge(format!(
                "'{}' failed: {}",
                op,
                reply.error.unwrap_or_else(|| "unknown driver error".to_string())
            )))
        }
    }

    pub async fn launch(&self, config: &BrowserConfig) -> E2eResult<()> {
        self.call("launch", json!({ "headless": config.headless }))
            .await?;
        Ok(())
    }

    /// Create the suite's single browsing context and start tracing with
    /// screenshots and DOM snapshots.
    pub async fn new_context(&self, config: &BrowserConfig) -> E2eResult<()> {
        std::fs::create_dir_all(&config.video_dir)?;
        self.call(
            "new_context",
            json!({
                "timezone": config.timezone,
                "width": config.viewport_width,
                "height": config.viewport_height,
                "video_dir": config.video_dir.to_string_lossy(),
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn new_page(&self) -> E2eResult<()> {
        self.call("new_page", Value::Null).await?;
        Ok(())
    }

    /// Register a script evaluated on every navigation before page scripts.
    pub async fn add_init_script(&self, source: &str) -> E2eResult<()> {
        self.call("add_init_script", json!({ "source": source }))
            .await?;
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        self.call("goto", json!({ "url": url })).await?;
        Ok(())
    }

    pub async fn reload(&self) -> E2eResult<()> {
        self.call("reload", Value::Null).await?;
        Ok(())
    }

    /// Bounding box of the first element matching `selector`. A missing or
    /// invisible element is a locator error carrying the selector.
    pub async fn bounding_box(&self, selector: &str) -> E2eResult<BoundingBox> {
        let value = self
            .call("bounding_box", json!({ "selector": selector }))
            .await?;
        if value.is_null() {
            return Err(E2eError::Locator(selector.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn mouse_move(&self, x: f64, y: f64) -> E2eResult<()> {
        self.call("mouse_move", json!({ "x": x, "y": y })).await?;
        Ok(())
    }

    pub async fn mouse_down(&self) -> E2eResult<()> {
        self.call("mouse_down", Value::Null).await?;
        Ok(())
    }

    pub async fn mouse_up(&self) -> E2eResult<()> {
        self.call("mouse_up", Value::Null).await?;
        Ok(())
    }

    /// Text contents of every element matching `selector`, document order.
    pub async fn texts(&self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self.call("texts", json!({ "selector": selector })).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Text contents of `selector` matches under the innermost element
    /// matching `container`. A missing container is a locator error.
    pub async fn texts_within(&self, container: &str, selector: &str) -> E2eResult<Vec<String>> {
        let value = self
            .call(
                "texts_within",
                json!({ "container": container, "selector": selector }),
            )
            .await?;
        if value.is_null() {
            return Err(E2eError::Locator(container.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Clear client-persisted state on the current page. Tolerant of pages
    /// where storage is inaccessible, so teardown never trips on it.
    pub async fn clear_storage(&self) -> E2eResult<()> {
        self.call("clear_storage", Value::Null).await?;
        Ok(())
    }

    pub async fn close_page(&self) -> E2eResult<()> {
        self.call("close_page", Value::Null).await?;
        Ok(())
    }

    pub async fn trace_chunk_start(&self) -> E2eResult<()> {
        self.call("trace_chunk_start", Value::Null).await?;
        Ok(())
    }

    /// Flush the current trace segment to `path`.
    pub async fn trace_chunk_stop(&self, path: &Path) -> E2eResult<()> {
        self.call("trace_chunk_stop", json!({ "path": path.to_string_lossy() }))
            .await?;
        Ok(())
    }

    /// Close context and browser, then bring the Node process down. Every
    /// stage is bounded; a wedged driver gets SIGTERM, then SIGKILL.
    pub async fn shutdown(mut self, teardown_timeout: Duration) -> E2eResult<()> {
        debug!("shutting down driver");

        match tokio::time::timeout(teardown_timeout, self.call("shutdown", Value::Null)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("graceful driver shutdown failed: {}", e),
            Err(_) => warn!("graceful driver shutdown timed out"),
        }

        let exited = matches!(
            tokio::time::timeout(teardown_timeout, self.child.wait()).await,
            Ok(Ok(_))
        );
        if exited {
            return Ok(());
        }

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        let exited = matches!(
            tokio::time::timeout(teardown_timeout, self.child.wait()).await,
            Ok(Ok(_))
        );
        if !exited {
            self.child
                .start_kill()
                .map_err(|e| E2eError::Lifecycle(format!("failed to kill driver: {}", e)))?;
            let _ = self.child.wait().await;
        }
        Ok(())
    }
}

/// The Node driver. One JSON request per stdin line, one JSON reply per
/// stdout line; requests are applied strictly in order.
const DRIVER_JS: &str = r"
// Taskboard E2E driver. Speaks newline-delimited JSON on stdin/stdout.
const readline = require('readline');
const { chromium } = require('playwright');

let browser = null;
let context = null;
let page = null;

function reply(id, ok, value, error) {
  process.stdout.write(
    JSON.stringify({ id, ok, value: value === undefined ? null : value, error: error || null }) + '\n'
  );
}

async function handle(req) {
  const p = req.params || {};
  switch (req.op) {
    case 'launch':
      browser = await chromium.launch({ headless: p.headless });
      return null;
    case 'new_context':
      context = await browser.newContext({
        timezoneId: p.timezone,
        viewport: { width: p.width, height: p.height },
        recordVideo: { dir: p.video_dir },
      });
      await context.tracing.start({ screenshots: true, snapshots: true });
      return null;
    case 'new_page':
      page = await context.newPage();
      return null;
    case 'add_init_script':
      await page.addInitScript({ content: p.source });
      return null;
    case 'goto':
      await page.goto(p.url);
      return null;
    case 'reload':
      await page.reload();
      return null;
    case 'bounding_box': {
      const loc = page.locator(p.selector).first();
      if ((await loc.count()) === 0) return null;
      return await loc.boundingBox();
    }
    case 'mouse_move':
      await page.mouse.move(p.x, p.y);
      return null;
    case 'mouse_down':
      await page.mouse.down();
      return null;
    case 'mouse_up':
      await page.mouse.up();
      return null;
    case 'texts':
      return await page.locator(p.selector).allTextContents();
    case 'texts_within': {
      const container = page.locator(p.container).last();
      if ((await container.count()) === 0) return null;
      return await container.locator(p.selector).allTextContents();
    }
    case 'clear_storage':
      await page.evaluate(() => {
        try { window.localStorage.clear(); } catch (e) {}
      });
      return null;
    case 'close_page':
      if (page) { await page.close(); page = null; }
      return null;
    case 'trace_chunk_start':
      await context.tracing.startChunk();
      return null;
    case 'trace_chunk_stop':
      await context.tracing.stopChunk({ path: p.path });
      return null;
    case 'shutdown':
      if (context) await context.close();
      if (browser) await browser.close();
      return null;
    default:
      throw new Error('unknown op: ' + req.op);
  }
}

let queue = Promise.resolve();
const rl = readline.createInterface({ input: process.stdin });
rl.on('line', (line) => {
  if (!line.trim()) return;
  let req;
  try {
    req = JSON.parse(line);
  } catch (e) {
    process.stderr.write('undecodable request: ' + line + '\n');
    return;
  }
  queue = queue.then(async () => {
    try {
      const value = await handle(req);
      reply(req.id, true, value);
      if (req.op === 'shutdown') process.exit(0);
    } catch (e) {
      reply(req.id, false, null, e.message);
    }
  });
});
";
