/// Tag endpoints
///
/// - `GET  /api/tags`: the caller's tags, alphabetically
/// - `POST /api/tags`: create a tag (201); color defaults to `#6B7280`

use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskmate_shared::{actions, auth::middleware::AuthContext, models::tag::Tag};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[serde(default)]
    #[validate(length(max = 100, message = "Tag name must be at most 100 characters"))]
    pub name: String,

    #[validate(length(min = 4, max = 16, message = "Color must be a hex value like #3B82F6"))]
    pub color: Option<String>,
}

pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Tag>>> {
    let tags = actions::list_tags(&state.db, auth.user_id).await?;
    Ok(Json(tags))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    req.validate()?;

    let tag = actions::create_tag(&state.db, auth.user_id, &req.name, req.color.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_optional() {
        let req: CreateTagRequest = serde_json::from_str(r#"{"name":"infra"}"#).unwrap();
        assert!(req.color.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_color_length_checked() {
        let req: CreateTagRequest = serde_json::from_str(r##"{"name":"infra","color":"#1"}"##).unwrap();
        assert!(req.validate().is_err());
    }
}
