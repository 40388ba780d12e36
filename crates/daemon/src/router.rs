//! HTTP request dispatch.
//!
//! Every request is handled the same way: the verb is mapped to a [`Verb`],
//! the path is resolved against the storage root, and a small table picks
//! the [`Operation`] from the verb and (for `GET` only) what currently exists
//! at the path. The operation then runs against the `files` components and
//! its result or error is rendered as a response.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::any;
use axum::Router;
use protocol::{content_disposition, EntryKind, ALLOWED_METHODS, OCTET_STREAM};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span, warn};

use crate::files::{
    DirectoryBrowser, FileError, FileRemover, FileTransfer, ResolvedPath, StorageRoot,
};

/// Result type for dispatch.
pub type RouterResult = Result<Response, RouterError>;

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// File operation error.
    #[error(transparent)]
    File(#[from] FileError),

    /// The verb has no operation.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(Method),

    /// A response header could not be built.
    #[error("invalid response header: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

impl RouterError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::File(e) => match e {
                FileError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                FileError::SymlinkOutsideRoot(_) => StatusCode::BAD_REQUEST,
                FileError::NotFound(_) => StatusCode::NOT_FOUND,
                FileError::IsDirectory(_) => StatusCode::BAD_REQUEST,
                FileError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FileError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RouterError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RouterError::Header(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        let mut response = (status, message).into_response();
        if let RouterError::MethodNotAllowed(_) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}

/// HTTP verbs the storage surface answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
    Head,
    Delete,
}

impl Verb {
    /// Map an HTTP method, if it is supported.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::PUT => Some(Verb::Put),
            Method::HEAD => Some(Verb::Head),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }

    /// Whether the verb needs a non-empty path. Only `GET` may address the root.
    pub fn requires_path(self) -> bool {
        !matches!(self, Verb::Get)
    }
}

/// The operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Download,
    Upload,
    Inspect,
    Delete,
}

impl Operation {
    /// Dispatch table. `existing` is what is at the path, and only matters
    /// for `GET`: directories are listed, anything else is downloaded (a
    /// missing path then fails as not found).
    pub fn select(verb: Verb, existing: Option<EntryKind>) -> Self {
        match (verb, existing) {
            (Verb::Get, Some(EntryKind::Directory)) => Operation::List,
            (Verb::Get, _) => Operation::Download,
            (Verb::Put, _) => Operation::Upload,
            (Verb::Head, _) => Operation::Inspect,
            (Verb::Delete, _) => Operation::Delete,
        }
    }
}

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub root: StorageRoot,
    pub browser: DirectoryBrowser,
    pub transfer: FileTransfer,
    pub remover: FileRemover,
}

impl AppState {
    /// Create handler state over an opened storage root.
    pub fn new(root: StorageRoot, max_upload_size: u64) -> Self {
        Self {
            root,
            browser: DirectoryBrowser::new(),
            transfer: FileTransfer::new(max_upload_size),
            remover: FileRemover::new(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the HTTP router.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .route("/{*path}", any(handle_path))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .with_state(state)
}

async fn handle_root(State(state): State<SharedState>, method: Method, body: Body) -> RouterResult {
    dispatch(&state, method, "", body).await
}

async fn handle_path(
    State(state): State<SharedState>,
    method: Method,
    Path(path): Path<String>,
    body: Body,
) -> RouterResult {
    dispatch(&state, method, &path, body).await
}

/// Run one request against the storage root.
pub async fn dispatch(
    state: &AppState,
    method: Method,
    request_path: &str,
    body: Body,
) -> RouterResult {
    let verb = Verb::from_method(&method).ok_or(RouterError::MethodNotAllowed(method))?;

    if verb.requires_path() && request_path.trim_matches('/').is_empty() {
        return Err(FileError::InvalidPath("a file path is required".to_string()).into());
    }

    let path = state.root.resolve(request_path)?;

    let existing = match verb {
        Verb::Get => state.browser.probe(&path).await?,
        _ => None,
    };

    match Operation::select(verb, existing) {
        Operation::List => handle_list(state, &path).await,
        Operation::Download => handle_download(state, &path).await,
        Operation::Upload => handle_upload(state, &path, body).await,
        Operation::Inspect => handle_inspect(state, &path).await,
        Operation::Delete => handle_delete(state, &path).await,
    }
}

async fn handle_list(state: &AppState, path: &ResolvedPath) -> RouterResult {
    let entries = state.browser.list_directory(path).await?;
    Ok(Json(entries).into_response())
}

async fn handle_download(state: &AppState, path: &ResolvedPath) -> RouterResult {
    let download = state.transfer.download(path).await?;

    let disposition = HeaderValue::from_str(&content_disposition(download.file_name()))?;
    let last_modified = download
        .modified()
        .map(|modified| HeaderValue::from_str(&httpdate::fmt_http_date(modified)))
        .transpose()?;

    let size = download.size();
    debug!(path = %path, size, "Streaming download");

    let mut response = Response::new(Body::from_stream(download.into_stream()));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Some(value) = last_modified {
        headers.insert(header::LAST_MODIFIED, value);
    }
    Ok(response)
}

async fn handle_upload(state: &AppState, path: &ResolvedPath, body: Body) -> RouterResult {
    let written = state.transfer.upload(path, body.into_data_stream()).await?;
    info!(path = %path, bytes = written, "File uploaded");

    Ok((
        StatusCode::OK,
        format!("Uploaded {} ({} bytes)", path, written),
    )
        .into_response())
}

async fn handle_inspect(state: &AppState, path: &ResolvedPath) -> RouterResult {
    let metadata = state.browser.inspect(path).await?;
    let last_modified = HeaderValue::from_str(&metadata.last_modified_http())?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_LENGTH, HeaderValue::from(metadata.size)),
            (header::LAST_MODIFIED, last_modified),
        ],
    )
        .into_response())
}

async fn handle_delete(state: &AppState, path: &ResolvedPath) -> RouterResult {
    let kind = state.remover.remove(path).await?;
    info!(path = %path, kind = kind.noun(), "Deleted");

    Ok((StatusCode::OK, format!("Deleted {} {}", kind.noun(), path)).into_response())
}
