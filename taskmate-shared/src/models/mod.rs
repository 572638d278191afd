/// Database models for TaskMate
///
/// # Models
///
/// - `user`: accounts; [`user::PublicUser`] is the client-facing shape
/// - `project`: the per-user default project
/// - `board`: the four kanban lanes of a project
/// - `tag`: per-project labels
/// - `task`: tasks, their relations and column updates
///
/// Query functions take any `PgExecutor`, so the same call works against the
/// pool or inside a transaction.

pub mod board;
pub mod project;
pub mod tag;
pub mod task;
pub mod user;

pub use board::{Board, BoardSlug, BoardSummary};
pub use project::Project;
pub use tag::{Tag, TagSummary};
pub use task::{Task, TaskChanges, TaskPriority, TaskWithRelations};
pub use user::{PublicUser, User};
