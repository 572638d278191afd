//! # TaskMate Client
//!
//! Client-side state for the kanban board: a local mirror of the server's
//! tasks, boards, users and tags, optimistic commands that update the mirror
//! before the server confirms, and the HTTP gateway they talk through.
//!
//! ## Modules
//!
//! - `store`: the local mirror and its queries
//! - `filter`: date range, quick filters and sort order
//! - `command`: optimistic create/update/delete/move with compensation
//! - `drag`: drag-and-drop state and WIP status
//! - `gateway`: the server boundary (`TaskGateway`, `HttpGateway`)
//! - `error`: client error type
//!
//! ## Example
//!
//! ```no_run
//! use taskmate_client::{gateway::{load_initial_data, HttpGateway}, store::TaskStore};
//!
//! # async fn example() -> Result<(), taskmate_client::error::ClientError> {
//! let gateway = HttpGateway::new("http://localhost:8080")?;
//! gateway.login("ada@example.com", "secret1").await?;
//!
//! let mut store = TaskStore::new();
//! load_initial_data(&mut store, &gateway).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod drag;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod store;
