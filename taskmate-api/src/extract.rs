/// Request extractors
///
/// [`ApiJson`], [`ApiPath`] and [`ApiQuery`] wrap the axum extractors of the
/// same name with rejections rendered as [`ApiError`], so a malformed body,
/// path segment or query string gets the same `{error, code}` shape as every
/// other failure.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header, routing::get, Router};
    use tower::Service as _;
    use uuid::Uuid;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let ApiJson(payload) = ApiJson::<Payload>::from_request(json_request(r#"{"name":"Ada"}"#), &())
            .await
            .unwrap();
        assert_eq!(payload.name, "Ada");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let err = ApiJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"name":"Ada"}"#))
            .unwrap();
        let err = ApiJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[derive(Debug, Deserialize)]
    struct Filter {
        board_id: Option<Uuid>,
    }

    #[tokio::test]
    async fn test_query_extracts_optional_uuid() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .uri(format!("/?board_id={}", id))
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let ApiQuery(filter) = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(filter.board_id, Some(id));

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (mut parts, _) = req.into_parts();
        let ApiQuery(filter) = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(filter.board_id, None);
    }

    #[tokio::test]
    async fn test_bad_query_value_is_bad_request() {
        let req = Request::builder()
            .uri("/?board_id=garbage")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        let err = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("UUID")));
    }

    #[tokio::test]
    async fn test_bad_path_segment_is_bad_request() {
        async fn echo(ApiPath(id): ApiPath<Uuid>) -> String {
            id.to_string()
        }

        let mut app: Router = Router::new().route("/items/:id", get(echo));
        let id = Uuid::new_v4();

        let ok = app
            .call(Request::builder().uri(format!("/items/{}", id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), axum::http::StatusCode::OK);

        let bad = app
            .call(Request::builder().uri("/items/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(bad.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(
            bad.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
