/// Server boundary for the client state layer
///
/// [`TaskGateway`] is what optimistic commands commit through; [`HttpGateway`]
/// implements it against the TaskMate HTTP API and also covers sign-in and
/// the cleanup endpoints.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskmate_shared::actions::{BoardWithTasks, CreateTask, UpdateTask};
use taskmate_shared::auth::cookie::{session_id_from_cookies, SESSION_COOKIE_NAME};
use taskmate_shared::cleanup::{CleanupOutcome, CleanupStats};
use taskmate_shared::lifecycle::MoveTask;
use taskmate_shared::models::{PublicUser, Tag, TaskWithRelations};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::store::TaskStore;

#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list_boards(&self) -> ClientResult<Vec<BoardWithTasks>>;
    async fn list_users(&self) -> ClientResult<Vec<PublicUser>>;
    async fn list_tags(&self) -> ClientResult<Vec<Tag>>;
    async fn create_task(&self, input: &CreateTask) -> ClientResult<TaskWithRelations>;
    async fn update_task(&self, id: Uuid, changes: &UpdateTask) -> ClientResult<TaskWithRelations>;
    async fn delete_task(&self, id: Uuid) -> ClientResult<()>;
    async fn move_task(&self, id: Uuid, request: MoveTask) -> ClientResult<TaskWithRelations>;
}

/// Fetches boards, users and tags concurrently into `store`.
///
/// On failure the store keeps its previous data and records the error.
pub async fn load_initial_data<G>(store: &mut TaskStore, gateway: &G) -> ClientResult<()>
where
    G: TaskGateway + ?Sized,
{
    store.set_loading(true);
    store.clear_error();

    let result = futures::try_join!(gateway.list_boards(), gateway.list_users(), gateway.list_tags());
    store.set_loading(false);

    match result {
        Ok((boards, users, tags)) => {
            tracing::debug!(boards = boards.len(), users = users.len(), tags = tags.len(), "Loaded board data");
            store.set_boards(boards);
            store.set_users(users);
            store.set_tags(tags);
            Ok(())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load board data");
            store.set_error(err.to_string());
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user: PublicUser,
}

#[derive(Debug, Deserialize)]
struct StatsBody {
    stats: CleanupStats,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct NewTag<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
}

/// HTTP implementation carrying the session cookie between requests
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    /// Reuses an existing session id instead of signing in
    pub fn with_session(self, session_id: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Some(session_id.into())),
            ..self
        }
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> ClientResult<PublicUser> {
        let body = Credentials {
            email,
            password,
            name: Some(name),
        };
        self.sign_in("/api/auth/register", &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<PublicUser> {
        let body = Credentials {
            email,
            password,
            name: None,
        };
        self.sign_in("/api/auth/login", &body).await
    }

    /// Ends the session on the server and forgets it locally.
    pub async fn logout(&self) -> ClientResult<()> {
        let request = self.request(self.client.post(self.url("/api/auth/logout"))).await;
        let response = request.send().await?;
        *self.session.write().await = None;
        parse::<serde_json::Value>(response).await.map(|_| ())
    }

    pub async fn me(&self) -> ClientResult<PublicUser> {
        let body: UserBody = self.get("/api/auth/me").await?;
        Ok(body.user)
    }

    pub async fn create_tag(&self, name: &str, color: Option<&str>) -> ClientResult<Tag> {
        self.send_json(self.client.post(self.url("/api/tags")), &NewTag { name, color })
            .await
    }

    pub async fn cleanup_stats(&self) -> ClientResult<CleanupStats> {
        let body: StatsBody = self.get("/api/cleanup").await?;
        Ok(body.stats)
    }

    pub async fn run_cleanup(&self) -> ClientResult<CleanupOutcome> {
        let request = self.request(self.client.post(self.url("/api/cleanup"))).await;
        parse(request.send().await?).await
    }

    async fn sign_in(&self, path: &str, body: &Credentials<'_>) -> ClientResult<PublicUser> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let session = session_from_headers(response.headers());

        let body: UserBody = parse(response).await?;
        let session = session.ok_or(ClientError::MissingSession)?;
        *self.session.write().await = Some(session);

        tracing::debug!(user_id = %body.user.id, "Signed in");
        Ok(body.user)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.read().await.as_deref() {
            Some(id) => builder.header(COOKIE, format!("{}={}", SESSION_COOKIE_NAME, id)),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(self.client.get(self.url(path))).await;
        parse(request.send().await?).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        builder: RequestBuilder,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.request(builder.json(body)).await;
        parse(request.send().await?).await
    }
}

#[async_trait]
impl TaskGateway for HttpGateway {
    async fn list_boards(&self) -> ClientResult<Vec<BoardWithTasks>> {
        self.get("/api/boards").await
    }

    async fn list_users(&self) -> ClientResult<Vec<PublicUser>> {
        self.get("/api/users").await
    }

    async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        self.get("/api/tags").await
    }

    async fn create_task(&self, input: &CreateTask) -> ClientResult<TaskWithRelations> {
        self.send_json(self.client.post(self.url("/api/tasks")), input).await
    }

    async fn update_task(&self, id: Uuid, changes: &UpdateTask) -> ClientResult<TaskWithRelations> {
        self.send_json(self.client.put(self.url(&format!("/api/tasks/{}", id))), changes)
            .await
    }

    async fn delete_task(&self, id: Uuid) -> ClientResult<()> {
        let request = self
            .request(self.client.delete(self.url(&format!("/api/tasks/{}", id))))
            .await;
        parse::<serde_json::Value>(request.send().await?).await.map(|_| ())
    }

    async fn move_task(&self, id: Uuid, request: MoveTask) -> ClientResult<TaskWithRelations> {
        self.send_json(self.client.post(self.url(&format!("/api/tasks/{}/move", id))), &request)
            .await
    }
}

/// Session id from the `Set-Cookie` headers of a sign-in response
fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_id_from_cookies)
}

async fn parse<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| fallback_message(status));

    tracing::debug!(status = %status, message = %message, "API request failed");
    Err(ClientError::Api { status, message })
}

fn fallback_message(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Request failed").to_string()
}
