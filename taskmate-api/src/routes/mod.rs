/// API route handlers, by resource:
///
/// - `health`: health check
/// - `auth`: register, login, logout, current user
/// - `tasks`: task CRUD and moves
/// - `boards`, `tags`, `users`: kanban reference data
/// - `cleanup`: on-demand cleanup and its preview
/// - `cron`: scheduled cleanup trigger

pub mod auth;
pub mod boards;
pub mod cleanup;
pub mod cron;
pub mod health;
pub mod tags;
pub mod tasks;
pub mod users;
