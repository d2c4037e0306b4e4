// tests/common/mod.rs
//
// In-memory stand-in for the job service (axum on an ephemeral port) plus a
// scripted JobsApi whose responses are released by hand.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use jobdash::api::{ApiClient, ApiError, JobsApi};
use jobdash::jobs::{Job, JobId, JobName, JobStatus, ListQuery, Page, StatusHistoryItem};

pub fn ts(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn job(id: JobId, name: &str, minutes: i64, status: Option<JobStatus>) -> Job {
    Job {
        id,
        name: name.to_string(),
        created_at: ts(minutes),
        updated_at: ts(minutes),
        current_status: status,
    }
}

// ----------------------------
// Fake HTTP backend
// ----------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
}

impl RecordedRequest {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .unwrap_or("")
            .split('&')
            .filter(|p| !p.is_empty())
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Default)]
pub struct Store {
    pub jobs: Vec<Job>,
    pub history: Vec<(JobId, JobStatus, DateTime<Utc>)>,
    pub next_id: JobId,
    pub requests: Vec<RecordedRequest>,

    // false: GET /api/jobs/ answers with a bare array
    pub paginate: bool,
    pub serve_history: bool,
    // answered instead of the next request, whatever it is
    pub fail_next: Option<(StatusCode, String)>,
}

#[derive(Clone)]
pub struct FakeBackend {
    pub base_url: String,
    pub store: Arc<Mutex<Store>>,
}

impl FakeBackend {
    pub fn client(&self) -> Arc<dyn JobsApi> {
        Arc::new(ApiClient::new(&self.base_url).expect("client builds"))
    }

    pub fn seed(&self, name: &str, status: Option<JobStatus>) -> JobId {
        let mut store = self.store.lock();
        insert_job(&mut store, name, status)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.store.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.store.lock().requests.len()
    }

    pub fn list_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET" && r.path == "/api/jobs/")
            .collect()
    }

    pub fn fail_next(&self, status: StatusCode, body: &str) {
        self.store.lock().fail_next = Some((status, body.to_string()));
    }

    pub fn stored(&self, id: JobId) -> Option<Job> {
        self.store.lock().jobs.iter().find(|j| j.id == id).cloned()
    }
}

fn insert_job(store: &mut Store, name: &str, status: Option<JobStatus>) -> JobId {
    store.next_id += 1;
    let id = store.next_id;
    let created = ts(id);
    store.jobs.push(Job {
        id,
        name: name.to_string(),
        created_at: created,
        updated_at: created,
        current_status: status,
    });
    if let Some(s) = status {
        store.history.push((id, s, created));
    }
    id
}

pub async fn spawn_backend() -> FakeBackend {
    spawn_backend_with(true, false).await
}

pub async fn spawn_backend_with(paginate: bool, serve_history: bool) -> FakeBackend {
    let store = Arc::new(Mutex::new(Store {
        paginate,
        serve_history,
        ..Store::default()
    }));

    let app = Router::new()
        .route("/api/jobs/", get(list_jobs).post(create_job))
        .route("/api/jobs/:id/", axum::routing::patch(update_job).delete(delete_job))
        .route("/api/jobs/:id/status-history", get(status_history))
        .layer(middleware::from_fn_with_state(store.clone(), record))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend serve");
    });

    FakeBackend {
        base_url: format!("http://{addr}"),
        store,
    }
}

type Shared = Arc<Mutex<Store>>;

async fn record(State(store): State<Shared>, req: Request, next: Next) -> Response {
    let injected = {
        let mut s = store.lock();
        s.requests.push(RecordedRequest {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(|q| q.to_string()),
            content_type: req
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string()),
        });
        s.fail_next.take()
    };

    match injected {
        Some((status, body)) => (status, body).into_response(),
        None => next.run(req).await,
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
    page_size: Option<usize>,
    status: Option<String>,
    ordering: Option<String>,
}

fn status_rank(s: Option<JobStatus>) -> u8 {
    match s {
        Some(JobStatus::Running) => 0,
        Some(JobStatus::Pending) | None => 1,
        Some(JobStatus::Completed) => 2,
        Some(JobStatus::Failed) => 3,
    }
}

async fn list_jobs(State(store): State<Shared>, Query(p): Query<ListParams>) -> Response {
    let s = store.lock();
    let mut jobs = s.jobs.clone();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if !s.paginate {
        return Json(jobs).into_response();
    }

    if let Some(status) = p.status.as_deref() {
        jobs.retain(|j| j.current_status.map(|c| c.as_str()) == Some(status));
    }

    match p.ordering.as_deref() {
        Some("created_at") => jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Some("name") => jobs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        Some("-name") => jobs.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase())),
        Some("current_status") => {
            jobs.sort_by_key(|j| status_rank(j.current_status));
        }
        _ => {}
    }

    let count = jobs.len();
    let page = p.page.unwrap_or(1).max(1);
    let size = p.page_size.unwrap_or(20).max(1);
    let results: Vec<Job> = jobs.into_iter().skip((page - 1) * size).take(size).collect();

    Json(json!({
        "count": count,
        "next": Value::Null,
        "previous": Value::Null,
        "results": results,
    }))
    .into_response()
}

async fn create_job(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    let name = body
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"name": ["Job name cannot be empty."]})),
        )
            .into_response();
    }

    let mut s = store.lock();
    let id = insert_job(&mut s, &name, Some(JobStatus::Pending));
    let job = s.jobs.iter().find(|j| j.id == id).cloned();
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn update_job(
    State(store): State<Shared>,
    Path(id): Path<JobId>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = store.lock();
    let next_ts = ts(1_000 + s.history.len() as i64);

    let raw = body.get("status_type").and_then(|v| v.as_str()).unwrap_or("");
    let status: Option<JobStatus> = serde_json::from_value(json!(raw)).ok();

    let Some(job) = s.jobs.iter_mut().find(|j| j.id == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Job not found."})),
        )
            .into_response();
    };
    let Some(status) = status else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status_type": [format!("\"{raw}\" is not a valid choice.")]})),
        )
            .into_response();
    };

    job.current_status = Some(status);
    job.updated_at = next_ts;
    let updated = job.clone();
    s.history.push((id, status, next_ts));
    Json(updated).into_response()
}

async fn delete_job(State(store): State<Shared>, Path(id): Path<JobId>) -> Response {
    let mut s = store.lock();
    let before = s.jobs.len();
    s.jobs.retain(|j| j.id != id);
    if s.jobs.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Job not found."})),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn status_history(State(store): State<Shared>, Path(id): Path<JobId>) -> Response {
    let s = store.lock();
    if !s.serve_history {
        return StatusCode::NOT_FOUND.into_response();
    }
    let items: Vec<Value> = s
        .history
        .iter()
        .enumerate()
        .filter(|(_, (job_id, _, _))| *job_id == id)
        .map(|(i, (_, status, at))| json!({"id": i + 1, "status": status, "changed_at": at}))
        .collect();
    Json(items).into_response()
}

// ----------------------------
// Scripted JobsApi
// ----------------------------

type ListReply = Result<Page<Job>, ApiError>;
type HistoryReply = Result<Vec<StatusHistoryItem>, ApiError>;

/// Every list/history call waits until the test releases its reply, so
/// response order is fully controlled.
#[derive(Default)]
pub struct GatedApi {
    list_gates: Mutex<VecDeque<oneshot::Receiver<ListReply>>>,
    history_gates: Mutex<VecDeque<oneshot::Receiver<HistoryReply>>>,
    pub seen_queries: Mutex<Vec<ListQuery>>,
    pub history_calls: Mutex<usize>,
}

impl GatedApi {
    pub fn list_gate(&self) -> oneshot::Sender<ListReply> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().push_back(rx);
        tx
    }

    pub fn history_gate(&self) -> oneshot::Sender<HistoryReply> {
        let (tx, rx) = oneshot::channel();
        self.history_gates.lock().push_back(rx);
        tx
    }
}

#[async_trait]
impl JobsApi for GatedApi {
    async fn list_jobs(&self, query: &ListQuery) -> Result<Page<Job>, ApiError> {
        self.seen_queries.lock().push(*query);
        let gate = self.list_gates.lock().pop_front();
        match gate {
            Some(rx) => rx.await.unwrap_or(Err(ApiError::Aborted)),
            None => Err(ApiError::Unknown("no scripted list reply".into())),
        }
    }

    async fn create_job(&self, _name: &JobName) -> Result<Job, ApiError> {
        Err(ApiError::Unknown("not scripted".into()))
    }

    async fn update_job_status(&self, _id: JobId, _status: JobStatus) -> Result<Job, ApiError> {
        Err(ApiError::Unknown("not scripted".into()))
    }

    async fn delete_job(&self, _id: JobId) -> Result<(), ApiError> {
        Err(ApiError::Unknown("not scripted".into()))
    }

    async fn status_history(&self, _id: JobId) -> Result<Vec<StatusHistoryItem>, ApiError> {
        *self.history_calls.lock() += 1;
        let gate = self.history_gates.lock().pop_front();
        match gate {
            Some(rx) => rx.await.unwrap_or(Err(ApiError::Aborted)),
            None => Err(ApiError::Unknown("no scripted history reply".into())),
        }
    }
}

pub fn page_of(jobs: Vec<Job>, total_count: u64) -> Page<Job> {
    Page {
        items: jobs,
        total_count,
    }
}
