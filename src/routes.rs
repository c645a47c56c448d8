use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::bias::{summarize_by_leaning, summarize_by_source};
use crate::db::Database;
use crate::error::Error;
use crate::feed::compose_feed;
use crate::model::{ArticleRequest, PreferenceRequest, SourceRequest, UserRequest};

pub struct AppState {
    pub db: Arc<Database>,
}

// Custom error type
pub struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Error::Invalid(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Error::StoreUnavailable(err) => {
                error!("Store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An unexpected error occurred." })),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Invalid(rejection.body_text())
    }
}

type ApiResult<T> = Result<T, AppError>;

/// `Json` extractor whose rejections use the API's error body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

fn not_found(entity: &str, id: i64) -> AppError {
    AppError(Error::NotFound(format!("{} with Id={} not found.", entity, id)))
}

fn created<T: serde::Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/sources", get(list_sources).post(create_source))
        .route(
            "/sources/:id",
            get(get_source).put(update_source).delete(delete_source),
        )
        .route("/articles", get(list_articles).post(create_article))
        .route("/articles/bias-summary", get(bias_summary))
        .route("/articles/bias-by-source", get(bias_by_source))
        .route(
            "/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/feed", get(user_feed))
        .route(
            "/users/:id/preferences",
            get(list_preferences).post(create_preference),
        )
        .route(
            "/users/:id/preferences/:preference_id",
            axum::routing::delete(delete_preference),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// Liveness

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

// Derived views

pub async fn user_feed(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let feed = compose_feed(state.db.as_ref(), user_id).await?;
    Ok(Json(feed))
}

pub async fn bias_summary(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let summary = summarize_by_leaning(state.db.as_ref()).await?;
    Ok(Json(summary))
}

pub async fn bias_by_source(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let summaries = summarize_by_source(state.db.as_ref()).await?;
    Ok(Json(summaries))
}

// Sources

pub async fn create_source(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SourceRequest>,
) -> ApiResult<Response> {
    let source = state.db.create_source(&request.validate()?).await?;
    Ok(created(format!("/sources/{}", source.id), source))
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_sources().await?))
}

pub async fn get_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let source = state
        .db
        .get_source(id)
        .await?
        .ok_or_else(|| not_found("NewsSource", id))?;
    Ok(Json(source))
}

pub async fn update_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<SourceRequest>,
) -> ApiResult<impl IntoResponse> {
    let source = state
        .db
        .update_source(id, &request.validate()?)
        .await?
        .ok_or_else(|| not_found("NewsSource", id))?;
    Ok(Json(source))
}

pub async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_source(id).await? {
        return Err(not_found("NewsSource", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Articles

async fn ensure_source_exists(db: &Database, source_id: i64) -> ApiResult<()> {
    if db.get_source(source_id).await?.is_none() {
        return Err(AppError(Error::Invalid(format!(
            "NewsSource with Id={} does not exist.",
            source_id
        ))));
    }
    Ok(())
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ArticleRequest>,
) -> ApiResult<Response> {
    let article = request.validate()?;
    ensure_source_exists(&state.db, article.source_id).await?;

    let article = state.db.create_article(&article).await?;
    Ok(created(format!("/articles/{}", article.id), article))
}

pub async fn list_articles(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_articles().await?))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let article = state
        .db
        .get_article(id)
        .await?
        .ok_or_else(|| not_found("Article", id))?;
    Ok(Json(article))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<ArticleRequest>,
) -> ApiResult<impl IntoResponse> {
    let article = request.validate()?;
    ensure_source_exists(&state.db, article.source_id).await?;

    let article = state
        .db
        .update_article(id, &article)
        .await?
        .ok_or_else(|| not_found("Article", id))?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_article(id).await? {
        return Err(not_found("Article", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Users

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<UserRequest>,
) -> ApiResult<Response> {
    let user = state.db.create_user(&request.validate()?).await?;
    Ok(created(format!("/users/{}", user.id), user))
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_users().await?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| not_found("AppUser", id))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<UserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .update_user(id, &request.validate()?)
        .await?
        .ok_or_else(|| not_found("AppUser", id))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_user(id).await? {
        return Err(not_found("AppUser", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Preferences

pub async fn list_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if state.db.get_user(user_id).await?.is_none() {
        return Err(not_found("AppUser", user_id));
    }
    Ok(Json(state.db.list_preferences(user_id).await?))
}

pub async fn create_preference(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    JsonBody(request): JsonBody<PreferenceRequest>,
) -> ApiResult<Response> {
    let topic = request.validate()?;
    if state.db.get_user(user_id).await?.is_none() {
        return Err(not_found("AppUser", user_id));
    }

    let preference = state.db.create_preference(user_id, &topic).await?;
    Ok(created(
        format!("/users/{}/preferences/{}", user_id, preference.id),
        preference,
    ))
}

pub async fn delete_preference(
    State(state): State<Arc<AppState>>,
    Path((user_id, preference_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_preference(user_id, preference_id).await? {
        return Err(AppError(Error::NotFound(format!(
            "UserPreference with Id={} for AppUser {} not found.",
            preference_id, user_id
        ))));
    }
    Ok(StatusCode::NO_CONTENT)
}
