//! # cache-guard
//!
//! A fail-open, backend-agnostic cache facade for Rust.
//!
//! ## Features
//!
//! - **Fail-Open:** Every operation swallows backend failures: callers get a
//!   default (`None`, empty set, silent no-op) plus a log line, never an error
//! - **Backend Agnostic:** In-memory and Redis (standalone, cluster, sentinel)
//!   backends behind one trait; bring your own by implementing `CacheBackend`
//! - **Explicit Value Paths:** Plain-text and JSON-structured values take
//!   distinct, compile-time-dispatched paths: no runtime type inspection
//! - **Hash and Pattern Operations:** Field-level hash access plus glob-style
//!   key scans, with the same degrade-gracefully contract
//! - **Framework Independent:** Zero dependencies on web frameworks
//!
//! ## Quick Start
//!
//! ```
//! use cache_guard::{CacheFacade, backend::InMemoryBackend};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Profile {
//!     name: String,
//!     age: u32,
//! }
//!
//! # async fn example() {
//! let cache = CacheFacade::new(InMemoryBackend::new());
//!
//! // Text path
//! cache.set_text("user:1", "alice", None).await;
//! let name = cache.get_text("user:1").await;
//!
//! // Structured path, with expiry applied atomically with the write
//! let profile = Profile { name: "alice".into(), age: 30 };
//! cache.set("profile:1", &profile, Some(Duration::from_secs(60))).await;
//! let cached: Option<Profile> = cache.get("profile:1").await;
//! # }
//! ```
//!
//! ## The Contract
//!
//! This crate trades consistency signals for availability: a backend outage
//! turns reads into misses and writes into no-ops, visible only in logs.
//! Callers that need to distinguish "absent" from "backend down", or that
//! want their own retry policy, should drive a [`CacheBackend`] directly
//! instead of going through the facade.

#[macro_use]
extern crate log;

pub mod backend;
pub mod error;
pub mod facade;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use error::{Error, Result};
pub use facade::CacheFacade;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
