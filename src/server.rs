//! HTTP server for the current archive
//!
//! - `GET /` and `GET /?sha256=<hash>` serve the archive
//! - `GET /by-sha256/<hash>.tar.gz` serves the archive by content address
//! - `GET /status` reports what is being served
//!
//! A request naming a hash other than the current one gets 410 Gone, and
//! anything before the first build finishes gets 503.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::archive::ARCHIVE_EXTENSION;
use crate::error::{RelayError, RelayResult};
use crate::publisher::{published_url, CurrentArchive};

/// Content type of served archives
pub const ARCHIVE_CONTENT_TYPE: &str = "application/gzip";

#[derive(Clone)]
pub struct ServerState {
    current: Arc<CurrentArchive>,
    url_base: Arc<str>,
}

impl ServerState {
    pub fn new(current: Arc<CurrentArchive>, url_base: &str) -> Self {
        Self {
            current,
            url_base: Arc::from(url_base),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveQuery {
    sha256: Option<String>,
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub ready: bool,
    pub sha256: Option<String>,
    pub size: Option<usize>,
    pub files: Option<usize>,
    pub built_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(serve_current))
        .route("/by-sha256/:file", get(serve_by_hash))
        .route("/status", get(status))
        .with_state(state)
}

/// Bind the listen address. Failure here ends the run before any unit starts.
pub async fn bind(addr: &str) -> RelayResult<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    if let Ok(local) = listener.local_addr() {
        info!("serving archives on http://{}", local);
    }
    Ok(listener)
}

/// Serve until `cancel` fires.
pub async fn serve(listener: TcpListener, state: ServerState, cancel: CancellationToken) -> RelayResult<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            debug!("shutting down archive server");
        })
        .await?;
    Ok(())
}

async fn serve_current(State(state): State<ServerState>, Query(query): Query<ArchiveQuery>) -> Response {
    let wanted = query.sha256.filter(|s| !s.is_empty());
    archive_response(&state, wanted.as_deref())
}

async fn serve_by_hash(State(state): State<ServerState>, Path(file): Path<String>) -> Response {
    let suffix = format!(".{}", ARCHIVE_EXTENSION);
    match file.strip_suffix(&suffix) {
        Some(hash) if !hash.is_empty() => archive_response(&state, Some(hash)),
        _ => (StatusCode::NOT_FOUND, format!("expected <sha256>{}\n", suffix)).into_response(),
    }
}

async fn status(State(state): State<ServerState>) -> Json<Status> {
    let body = match state.current.get() {
        Some(archive) => Status {
            ready: true,
            sha256: Some(archive.hash().to_string()),
            size: Some(archive.len()),
            files: Some(archive.file_count()),
            built_at: Some(archive.built_at()),
            url: Some(published_url(&state.url_base, archive.hash())),
        },
        None => Status {
            ready: false,
            sha256: None,
            size: None,
            files: None,
            built_at: None,
            url: None,
        },
    };
    Json(body)
}

fn archive_response(state: &ServerState, wanted: Option<&str>) -> Response {
    let Some(archive) = state.current.get() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "archive not built yet\n").into_response();
    };

    if let Some(wanted) = wanted {
        if !archive.hash().matches_str(wanted) {
            return (
                StatusCode::GONE,
                format!("archive hash is {:?} but wanted {:?}\n", archive.hash().hex(), wanted),
            )
                .into_response();
        }
    }

    let headers = [
        (header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", archive.file_name()),
        ),
    ];
    (StatusCode::OK, headers, Body::from(archive.bytes().to_vec())).into_response()
}
