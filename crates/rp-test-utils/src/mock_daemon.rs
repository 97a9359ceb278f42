//! Mock proxy daemon management API
//!
//! Binds to `127.0.0.1:0` and serves the subset of the management API the
//! panel uses, keeping created objects in memory so tests can assert on
//! what the real client sent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tokio::task::JoinHandle;

use rp_protocol::{
    ApiStatus, ChainConfig, ChainSummary, DaemonConfig, ObserverConfig, ServiceConfig,
    ServiceState, ServiceStatus, ServiceSummary, ERR_DUPLICATE, ERR_NOT_FOUND,
};

/// One request as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query
    pub target: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct Objects {
    services: Vec<(ServiceConfig, ServiceState)>,
    chains: Vec<ChainConfig>,
    observers: Vec<ObserverConfig>,
    requests: Vec<RecordedRequest>,
    delay: Duration,
}

struct MockState {
    /// Expected `Authorization` header, if auth is enforced
    auth: Option<String>,
    objects: Mutex<Objects>,
    saves: AtomicUsize,
}

impl MockState {
    fn lock(&self) -> MutexGuard<'_, Objects> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the request, apply the configured delay, then check auth
    async fn admit(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), Response> {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let delay = {
            let mut objects = self.lock();
            objects.requests.push(RecordedRequest {
                method: method.to_string(),
                target: uri
                    .path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_else(|| uri.path().to_string()),
                authorization: authorization.clone(),
            });
            objects.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match &self.auth {
            Some(expected) if authorization.as_deref() != Some(expected.as_str()) => Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiStatus::error(40100, "unauthorized")),
            )
                .into_response()),
            _ => Ok(()),
        }
    }
}

fn ok() -> Response {
    Json(ApiStatus::ok()).into_response()
}

fn duplicate(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiStatus::error(ERR_DUPLICATE, format!("object {} duplicated", name))),
    )
        .into_response()
}

fn missing(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiStatus::error(ERR_NOT_FOUND, format!("object {} not found", name))),
    )
        .into_response()
}

/// A running mock daemon; the server stops when this is dropped
pub struct MockDaemon {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockDaemon {
    /// Start without authentication
    pub async fn start() -> std::io::Result<Self> {
        Self::launch(None).await
    }

    /// Start requiring this exact `Authorization` header value
    pub async fn start_with_auth(expected: &str) -> std::io::Result<Self> {
        Self::launch(Some(expected.to_string())).await
    }

    async fn launch(auth: Option<String>) -> std::io::Result<Self> {
        let state = Arc::new(MockState {
            auth,
            objects: Mutex::new(Objects::default()),
            saves: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/config", get(get_config).post(save_config))
            .route("/config/services", post(create_service))
            .route("/config/services/:name", delete(delete_service))
            .route("/config/chains", post(create_chain))
            .route("/config/chains/:name", delete(delete_chain))
            .route("/config/observers", post(create_observer))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for a node's `api_url`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Delay every response by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    /// Place a service directly, bypassing the API
    pub fn put_service(&self, name: &str, state: ServiceState) {
        let mut objects = self.state.lock();
        objects.services.retain(|(s, _)| s.name != name);
        objects.services.push((
            ServiceConfig {
                name: name.to_string(),
                ..Default::default()
            },
            state,
        ));
    }

    /// Service declaration as received
    pub fn service(&self, name: &str) -> Option<ServiceConfig> {
        self.state
            .lock()
            .services
            .iter()
            .find(|(s, _)| s.name == name)
            .map(|(s, _)| s.clone())
    }

    pub fn chain(&self, name: &str) -> Option<ChainConfig> {
        self.state.lock().chains.iter().find(|c| c.name == name).cloned()
    }

    pub fn observer(&self, name: &str) -> Option<ObserverConfig> {
        self.state
            .lock()
            .observers
            .iter()
            .find(|o| o.name == name)
            .cloned()
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of `POST /config` calls
    pub fn save_count(&self) -> usize {
        self.state.saves.load(Ordering::SeqCst)
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn get_config(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let objects = state.lock();
    let config = DaemonConfig {
        services: objects
            .services
            .iter()
            .map(|(s, st)| ServiceSummary {
                name: s.name.clone(),
                status: Some(ServiceStatus {
                    create_time: Some(1_700_000_000),
                    state: st.clone(),
                }),
            })
            .collect(),
        chains: objects
            .chains
            .iter()
            .map(|c| ChainSummary {
                name: c.name.clone(),
            })
            .collect(),
    };
    Json(config).into_response()
}

async fn save_config(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    state.saves.fetch_add(1, Ordering::SeqCst);
    ok()
}

async fn create_service(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(service): Json<ServiceConfig>,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let mut objects = state.lock();
    if objects.services.iter().any(|(s, _)| s.name == service.name) {
        return duplicate(&service.name);
    }
    objects.services.push((service, ServiceState::Ready));
    ok()
}

async fn delete_service(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let mut objects = state.lock();
    let before = objects.services.len();
    objects.services.retain(|(s, _)| s.name != name);
    if objects.services.len() == before {
        return missing(&name);
    }
    ok()
}

async fn create_chain(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(chain): Json<ChainConfig>,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let mut objects = state.lock();
    if objects.chains.iter().any(|c| c.name == chain.name) {
        return duplicate(&chain.name);
    }
    objects.chains.push(chain);
    ok()
}

async fn delete_chain(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let mut objects = state.lock();
    let before = objects.chains.len();
    objects.chains.retain(|c| c.name != name);
    if objects.chains.len() == before {
        return missing(&name);
    }
    ok()
}

async fn create_observer(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(observer): Json<ObserverConfig>,
) -> Response {
    if let Err(response) = state.admit(&method, &uri, &headers).await {
        return response;
    }
    let mut objects = state.lock();
    if objects.observers.iter().any(|o| o.name == observer.name) {
        return duplicate(&observer.name);
    }
    objects.observers.push(observer);
    ok()
}
