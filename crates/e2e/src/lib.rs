//! Taskboard E2E Suite
//!
//! Rust-controlled end-to-end tests for the Taskboard Kanban application:
//! - Seeds the backend task store before every scenario
//! - Drives a real browser through a long-lived Playwright driver process
//! - Simulates drag-and-drop with raw pointer gestures
//! - Asserts rendered and persisted board state
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Suite Runner (Rust)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Harness (one per run)                                       │
//! │    ├── BackendClient ──► PUT/GET /tasks      (port 3001)     │
//! │    └── BrowserBridge ──► node driver ──► chromium            │
//! │          (NDJSON over stdin/stdout)       │                  │
//! │                                           ▼                  │
//! │                             Taskboard UI  (port 3000)        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                             │
//! │    ├── name, tags, skip                                      │
//! │    └── steps: [Step]                                         │
//! │          ├── navigate { path, expect_tasks }                 │
//! │          ├── drag_to { task, target, via }                   │
//! │          ├── drag_onto_self { task, dy }                     │
//! │          ├── reload                                          │
//! │          └── assert_* { ... }                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The application stack under test is an external collaborator; the suite
//! only seeds it, drives it, and reads it back.

pub mod backend;
pub mod board;
pub mod driver;
pub mod error;
pub mod gesture;
pub mod harness;
pub mod overlay;
pub mod runner;
pub mod scenario;
pub mod wait;

pub use error::{E2eError, E2eResult};
pub use harness::{Harness, HarnessConfig};
pub use runner::{SuiteResult, SuiteRunner};
pub use scenario::{Scenario, Step};
