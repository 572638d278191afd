/// Optimistic task commands
///
/// A command changes the local store first, then commits through a
/// [`TaskGateway`]. On success the store is reconciled with the server's copy
/// of the task; on failure the command's compensating action restores what
/// it changed and the error is recorded on the store.
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use taskmate_client::command::{execute, DeleteTaskCommand};
/// use taskmate_client::gateway::HttpGateway;
/// use taskmate_client::store::TaskStore;
/// use uuid::Uuid;
///
/// # async fn example(store: &mut TaskStore, gateway: &HttpGateway, task_id: Uuid) {
/// if let Err(err) = execute(store, gateway, DeleteTaskCommand::new(task_id), Utc::now()).await {
///     eprintln!("delete rolled back: {}", err);
/// }
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskmate_shared::actions::{CreateTask, UpdateTask};
use taskmate_shared::lifecycle::MoveTask;
use taskmate_shared::models::TaskWithRelations;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::gateway::TaskGateway;
use crate::store::TaskStore;

#[async_trait]
pub trait OptimisticCommand: Send + Sync {
    type Output: Send;

    /// Local change, made before the server is asked
    fn apply(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> ClientResult<()>;

    /// Undoes [`apply`](Self::apply) after a failed commit
    fn compensate(&mut self, store: &mut TaskStore);

    async fn commit(&self, gateway: &dyn TaskGateway) -> ClientResult<Self::Output>;

    /// Replaces the local guess with what the server returned
    fn reconcile(&mut self, store: &mut TaskStore, output: &Self::Output);
}

/// Applies `command` locally, commits it, then reconciles or compensates.
pub async fn execute<C>(
    store: &mut TaskStore,
    gateway: &dyn TaskGateway,
    mut command: C,
    now: DateTime<Utc>,
) -> ClientResult<C::Output>
where
    C: OptimisticCommand,
{
    store.clear_error();

    if let Err(err) = command.apply(store, now) {
        store.set_error(err.to_string());
        return Err(err);
    }

    match command.commit(gateway).await {
        Ok(output) => {
            command.reconcile(store, &output);
            Ok(output)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Server rejected change, rolling back");
            command.compensate(store);
            store.set_error(err.to_string());
            Err(err)
        }
    }
}

pub struct CreateTaskCommand {
    input: CreateTask,
    creator_id: Uuid,
    temp_id: Option<Uuid>,
}

impl CreateTaskCommand {
    pub fn new(input: CreateTask, creator_id: Uuid) -> Self {
        Self {
            input,
            creator_id,
            temp_id: None,
        }
    }
}

#[async_trait]
impl OptimisticCommand for CreateTaskCommand {
    type Output = TaskWithRelations;

    fn apply(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> ClientResult<()> {
        self.temp_id = Some(store.add_task(&self.input, self.creator_id, now)?);
        Ok(())
    }

    fn compensate(&mut self, store: &mut TaskStore) {
        if let Some(id) = self.temp_id.take() {
            store.remove_task(id);
        }
    }

    async fn commit(&self, gateway: &dyn TaskGateway) -> ClientResult<TaskWithRelations> {
        gateway.create_task(&self.input).await
    }

    fn reconcile(&mut self, store: &mut TaskStore, output: &TaskWithRelations) {
        match self.temp_id.take() {
            Some(id) => store.replace_task(id, output.clone()),
            None => store.insert_task(output.clone()),
        }
    }
}

pub struct UpdateTaskCommand {
    id: Uuid,
    changes: UpdateTask,
    previous: Option<TaskWithRelations>,
}

impl UpdateTaskCommand {
    pub fn new(id: Uuid, changes: UpdateTask) -> Self {
        Self {
            id,
            changes,
            previous: None,
        }
    }
}

#[async_trait]
impl OptimisticCommand for UpdateTaskCommand {
    type Output = TaskWithRelations;

    fn apply(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> ClientResult<()> {
        if !self.changes.has_changes() {
            return Err(ClientError::Invalid("No valid fields to update".to_string()));
        }
        self.previous = Some(store.task(self.id).cloned().ok_or(ClientError::UnknownTask(self.id))?);
        store.update_task(self.id, &self.changes, now);
        Ok(())
    }

    fn compensate(&mut self, store: &mut TaskStore) {
        if let Some(previous) = self.previous.take() {
            store.replace_task(self.id, previous);
        }
    }

    async fn commit(&self, gateway: &dyn TaskGateway) -> ClientResult<TaskWithRelations> {
        gateway.update_task(self.id, &self.changes).await
    }

    fn reconcile(&mut self, store: &mut TaskStore, output: &TaskWithRelations) {
        self.previous = None;
        store.replace_task(self.id, output.clone());
    }
}

pub struct DeleteTaskCommand {
    id: Uuid,
    removed: Option<TaskWithRelations>,
}

impl DeleteTaskCommand {
    pub fn new(id: Uuid) -> Self {
        Self { id, removed: None }
    }
}

#[async_trait]
impl OptimisticCommand for DeleteTaskCommand {
    type Output = ();

    fn apply(&mut self, store: &mut TaskStore, _now: DateTime<Utc>) -> ClientResult<()> {
        self.removed = Some(store.remove_task(self.id).ok_or(ClientError::UnknownTask(self.id))?);
        Ok(())
    }

    fn compensate(&mut self, store: &mut TaskStore) {
        if let Some(task) = self.removed.take() {
            store.insert_task(task);
        }
    }

    async fn commit(&self, gateway: &dyn TaskGateway) -> ClientResult<()> {
        gateway.delete_task(self.id).await
    }

    fn reconcile(&mut self, _store: &mut TaskStore, _output: &()) {
        self.removed = None;
    }
}

/// Moves a task to another board; the server applies WIP limits and
/// completion stamps.
#[derive(Debug)]
pub struct MoveTaskCommand {
    id: Uuid,
    request: MoveTask,
    previous: Option<TaskWithRelations>,
}

impl MoveTaskCommand {
    pub fn new(id: Uuid, board_id: Uuid, position: Option<i32>) -> Self {
        Self {
            id,
            request: MoveTask { board_id, position },
            previous: None,
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.id
    }

    pub fn target_board(&self) -> Uuid {
        self.request.board_id
    }
}

#[async_trait]
impl OptimisticCommand for MoveTaskCommand {
    type Output = TaskWithRelations;

    fn apply(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> ClientResult<()> {
        self.previous = Some(store.task(self.id).cloned().ok_or(ClientError::UnknownTask(self.id))?);
        store.move_task(self.id, self.request.board_id, self.request.position, now);
        Ok(())
    }

    fn compensate(&mut self, store: &mut TaskStore) {
        if let Some(previous) = self.previous.take() {
            store.replace_task(self.id, previous);
        }
    }

    async fn commit(&self, gateway: &dyn TaskGateway) -> ClientResult<TaskWithRelations> {
        gateway.move_task(self.id, self.request).await
    }

    fn reconcile(&mut self, store: &mut TaskStore, output: &TaskWithRelations) {
        self.previous = None;
        store.replace_task(self.id, output.clone());
    }
}
