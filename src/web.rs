//! HTTP surface: the landing page and the random recommendation endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tokio::task;
use tower_http::trace::TraceLayer;

use crate::metadata::{MetadataReader, Recommendation};

const INDEX_HTML: &str = include_str!("../static/index.html");
const NO_VIDEOS_MESSAGE: &str = "No videos available";

#[derive(Clone)]
pub struct AppState {
    reader: Arc<MetadataReader>,
}

impl AppState {
    pub fn new(reader: MetadataReader) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }

    async fn random_video(&self) -> ApiResult<Option<Recommendation>> {
        let reader = self.reader.clone();
        task::spawn_blocking(move || reader.random_video())
            .await
            .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
            .map_err(|err| ApiError::internal(format!("{err:#}")))
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        }
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(reader: MetadataReader) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/recommend", get(recommend))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(reader))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn recommend(State(state): State<AppState>) -> ApiResult<Json<Recommendation>> {
    let video = state
        .random_video()
        .await?
        .ok_or_else(|| ApiError::not_found(NO_VIDEOS_MESSAGE))?;
    Ok(Json(video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataStore, NewVideo};
    use anyhow::Result;
    use axum::body::to_bytes;
    use serde_json::Value;
    use tempfile::tempdir;

    async fn body_json(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn recommend_on_empty_table_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("videos.db");
        MetadataStore::open(&path)?;

        let state = AppState::new(MetadataReader::new(&path));
        let response = recommend(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await?;
        assert_eq!(body, serde_json::json!({ "error": "No videos available" }));
        assert!(body.get("url").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn recommend_returns_a_stored_video() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("videos.db");
        let store = MetadataStore::open(&path)?;
        for id in ["one", "two"] {
            store.insert_video(&NewVideo {
                title: format!("Video {id}"),
                url: format!("https://www.youtube.com/watch?v={id}"),
                thumbnail: format!("https://i/{id}.jpg"),
                published_date: "2021-05-05".into(),
                duration: 8,
            })?;
        }

        let reader = MetadataReader::new(&path);
        let response = recommend(State(AppState::new(reader.clone())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await?;
        let url = body["url"].as_str().expect("url field");
        assert!(reader.contains_url(url)?);
        assert!(body["title"].as_str().is_some_and(|t| t.starts_with("Video ")));
        assert!(body["thumbnail"].as_str().is_some());
        assert_eq!(body.as_object().map(|fields| fields.len()), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn missing_database_is_a_server_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("no-such-dir").join("videos.db");

        let response = recommend(State(AppState::new(MetadataReader::new(&path))))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await?["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn index_serves_the_landing_page() {
        let Html(page) = index().await;
        assert!(page.contains("/recommend"));
    }
}
