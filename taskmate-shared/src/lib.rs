//! # TaskMate Shared Library
//!
//! Domain types and business logic used by the TaskMate API server, the
//! cleanup worker and the client state layer.
//!
//! ## Module Organization
//!
//! - `db`: connection pool, migrations, retry and transaction helpers
//! - `models`: database models (users, projects, boards, tags, tasks)
//! - `auth`: passwords, sessions, cookies, registration and login
//! - `lifecycle`: moving tasks between boards (WIP limits, completion stamps)
//! - `actions`: owner-scoped task, board, tag and user operations
//! - `cleanup`: removal of tasks completed more than 48 hours ago
//! - `redis`: Redis client used by the session store
//! - `telemetry`: tracing subscriber setup for the binaries
//! - `error`: common error type

pub mod actions;
pub mod auth;
pub mod cleanup;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod redis;
pub mod telemetry;

/// Current version of the TaskMate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
