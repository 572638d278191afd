//! # TaskMate Worker Library
//!
//! Scheduled removal of stale completed tasks.
//!
//! ## Modules
//!
//! - `config`: worker configuration from environment variables
//! - `scheduler`: interval loop that runs the cleanup sweep and records reports

pub mod config;
pub mod scheduler;
