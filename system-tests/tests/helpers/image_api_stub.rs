// system-tests/tests/helpers/image_api_stub.rs
// ============================================================================
// Module: Image API Stub
// Description: In-process stand-in for The Cat API image endpoints.
// Purpose: Exercise the full contract suite without network access.
// Dependencies: axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! Serves `POST /v1/images/upload`, `GET /v1/images`, `GET /v1/images/{id}`,
//! and `DELETE /v1/images/{id}` from an in-memory store. [`StubBehavior`]
//! injects the deviations the failure-path tests need. Every request is
//! recorded with its method, path, query, and whether it carried the
//! expected key.

use std::collections::BTreeMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::multipart::MultipartRejection;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Default page size when `limit` is absent.
const DEFAULT_LIMIT: usize = 10;

/// Deviations from the compliant contract.
#[derive(Debug, Clone, Default)]
pub struct StubBehavior {
    /// Delay applied to every listing response.
    pub list_delay: Duration,
    /// Answer a repeated delete with 200 instead of 404.
    pub accept_redelete: bool,
    /// Report a missing upload file as plain text instead of JSON.
    pub text_missing_file: bool,
    /// Answer uploads that carry a file with 500.
    pub fail_file_uploads: bool,
}

/// Recorded request metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorized: bool,
}

#[derive(Debug, Clone)]
struct StoredImage {
    id: String,
    url: String,
    mime: String,
}

#[derive(Debug, Default)]
struct Store {
    images: BTreeMap<String, StoredImage>,
    next_id: u64,
}

#[derive(Clone)]
struct StubState {
    api_key: String,
    behavior: StubBehavior,
    store: Arc<Mutex<Store>>,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubState {
    /// Records the request and reports whether the key matched.
    fn admit(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
        let authorized = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == self.api_key);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(StubRequest {
                method: method.to_string(),
                path: uri.path().to_string(),
                query: uri.query().map(str::to_string),
                authorized,
            });
        }
        authorized
    }
}

/// Handle for the stub image API server.
pub struct ImageApiStubHandle {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    store: Arc<Mutex<Store>>,
}

impl ImageApiStubHandle {
    /// Returns the API base URL (including `/v1`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns captured requests in arrival order.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Returns the number of stored images.
    pub fn image_count(&self) -> usize {
        self.store.lock().map_or(0, |store| store.images.len())
    }
}

impl Drop for ImageApiStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a compliant stub that accepts `api_key`.
pub fn spawn_image_api_stub(api_key: &str) -> Result<ImageApiStubHandle, String> {
    spawn_image_api_stub_with(api_key, StubBehavior::default())
}

/// Spawns a stub with the given deviations.
pub fn spawn_image_api_stub_with(
    api_key: &str,
    behavior: StubBehavior,
) -> Result<ImageApiStubHandle, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("image stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("image stub listener nonblocking failed: {err}"))?;
    let addr =
        listener.local_addr().map_err(|err| format!("image stub local addr failed: {err}"))?;
    let base_url = format!("http://{addr}/v1");

    let requests = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(Mutex::new(Store::default()));
    let state = StubState {
        api_key: api_key.to_string(),
        behavior,
        store: Arc::clone(&store),
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/v1/images/upload", post(handle_upload))
        .route("/v1/images", get(handle_list))
        .route("/v1/images/{id}", get(handle_get).delete(handle_delete))
        .with_state(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(ImageApiStubHandle {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        requests,
        store,
    })
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "AUTHENTICATION_ERROR" }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "NOT_FOUND").into_response()
}

async fn handle_upload(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    if !state.admit(&method, &uri, &headers) {
        return unauthorized();
    }
    let mut mime = None;
    if let Ok(mut multipart) = multipart {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() != Some("file") {
                continue;
            }
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            if field.bytes().await.is_ok_and(|bytes| !bytes.is_empty()) {
                mime = Some(content_type);
            }
        }
    }
    let Some(mime) = mime else {
        return if state.behavior.text_missing_file {
            (StatusCode::BAD_REQUEST, "Bad Request: file is required").into_response()
        } else {
            (StatusCode::BAD_REQUEST, Json(json!({ "message": "\"file\" is required" })))
                .into_response()
        };
    };
    if state.behavior.fail_file_uploads {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upload backend unavailable").into_response();
    }
    let Ok(mut store) = state.store.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    store.next_id += 1;
    let id = format!("stub{:06}", store.next_id);
    let image = StoredImage {
        url: format!("https://cdn.stub.test/images/{id}.jpg"),
        id: id.clone(),
        mime,
    };
    store.images.insert(id, image.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": image.id, "url": image.url, "pending": 0, "approved": 1 })),
    )
        .into_response()
}

async fn handle_get(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !state.admit(&method, &uri, &headers) {
        return unauthorized();
    }
    let image = state.store.lock().ok().and_then(|store| store.images.get(&id).cloned());
    match image {
        Some(image) => {
            Json(json!({ "id": image.id, "url": image.url, "breeds": [], "categories": [] }))
                .into_response()
        }
        None => not_found(),
    }
}

async fn handle_list(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    if !state.admit(&method, &uri, &headers) {
        return unauthorized();
    }
    if !state.behavior.list_delay.is_zero() {
        sleep(state.behavior.list_delay).await;
    }
    let parse = |name: &str, default: usize| {
        params.get(name).map_or(Ok(default), |raw| raw.parse::<usize>())
    };
    let (Ok(page), Ok(limit)) = (parse("page", 0), parse("limit", DEFAULT_LIMIT)) else {
        return (StatusCode::BAD_REQUEST, "page and limit must be integers").into_response();
    };
    let allowed: Option<Vec<String>> = params
        .get("mime_types")
        .map(|raw| raw.split(',').map(|kind| mime_for_kind(kind.trim())).collect());
    let images: Vec<StoredImage> = state
        .store
        .lock()
        .map(|store| store.images.values().cloned().collect())
        .unwrap_or_default();
    let body: Vec<serde_json::Value> = images
        .into_iter()
        .filter(|image| allowed.as_ref().is_none_or(|allowed| allowed.contains(&image.mime)))
        .skip(page.saturating_mul(limit))
        .take(limit)
        .map(|image| json!({ "id": image.id, "url": image.url }))
        .collect();
    Json(body).into_response()
}

async fn handle_delete(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !state.admit(&method, &uri, &headers) {
        return unauthorized();
    }
    let removed = state.store.lock().ok().and_then(|mut store| store.images.remove(&id));
    if removed.is_some() || state.behavior.accept_redelete {
        Json(json!({ "message": "SUCCESS" })).into_response()
    } else {
        not_found()
    }
}

fn mime_for_kind(kind: &str) -> String {
    match kind {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "gif" => "image/gif".to_string(),
        other => other.to_string(),
    }
}
