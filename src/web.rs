use crate::{cache::MetaCache, errors::AppError, lang::Lang, metadata::MetadataRecord};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use url::Url;

const CACHE_CONTROL: &str = "public, max-age=1800";

#[derive(Clone)]
struct SharedState {
    cache: MetaCache,
}

pub fn router(cache: MetaCache) -> Router {
    let shared_state = Arc::new(SharedState { cache });

    Router::new()
        .route("/", get(og))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub async fn serve(cache: MetaCache, listen: &str) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");

    axum::serve(listener, router(cache))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::MissingUrl | AppError::InvalidUrl | AppError::UnsupportedLang(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::IO(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OgQuery {
    pub url: Option<String>,
    pub lang: Option<String>,
}

async fn og(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<OgQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    log::debug!("query: {query:?}");

    let url = query
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or(AppError::MissingUrl)?;

    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => return Err(AppError::InvalidUrl.into()),
    }

    // an empty `lang=` counts as absent
    let lang = query.lang.as_deref().filter(|lang| !lang.is_empty());
    if let Some(lang) = lang {
        if Lang::parse(lang).is_none() {
            return Err(AppError::UnsupportedLang(lang.to_string()).into());
        }
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());

    let record = state
        .cache
        .get(Some(url), lang, user_agent)
        .await
        .ok_or(AppError::InvalidUrl)?;

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        Json(MetadataRecord::clone(&record)),
    ))
}
