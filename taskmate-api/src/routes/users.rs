/// `GET /api/users`: the users the caller can assign tasks to, which is
/// only the caller.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskmate_shared::{actions, auth::middleware::AuthContext, models::user::PublicUser};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = actions::list_users(&state.db, auth.user_id).await?;
    Ok(Json(users))
}
