use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::jobs::view::paginate_locally;
use crate::jobs::{
    Job, JobId, JobName, JobStatus, ListQuery, Page, SortKey, StatusFilter, StatusHistoryItem,
};

pub mod error;
pub mod models;

pub use error::{extract_message, ApiError};
use models::{CreateJobRequest, JobListResponse, UpdateStatusRequest};

pub const JOBS_PATH: &str = "/api/jobs/";

/// The job resource as the controllers see it.
///
/// `ApiClient` is the HTTP implementation; tests swap in fakes.
#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn list_jobs(&self, query: &ListQuery) -> Result<Page<Job>, ApiError>;

    async fn create_job(&self, name: &JobName) -> Result<Job, ApiError>;

    async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<Job, ApiError>;

    async fn delete_job(&self, id: JobId) -> Result<(), ApiError>;

    /// Optional endpoint; most backends do not serve it yet.
    async fn status_history(&self, id: JobId) -> Result<Vec<StatusHistoryItem>, ApiError> {
        let _ = id;
        Err(ApiError::RequestFailed {
            status: 404,
            message: "status history is not supported".into(),
        })
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unknown(format!("could not build http client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        Self::with_timeout(
            &cfg.api_base_url,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn job_path(id: JobId) -> String {
        format!("{JOBS_PATH}{id}/")
    }

    /// Sends the request and turns every non-2xx answer into `RequestFailed`.
    async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<Response, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let response = build(self.http.request(method.clone(), &url))
            .send()
            .await?;

        let status = response.status();
        debug!(
            %method,
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job api request"
        );

        if status.is_success() {
            return Ok(response);
        }

        // a body we cannot read still gets the status-code message
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status.as_u16(), &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Err(ApiError::Unknown(
                "expected a response body but the server sent no content".into(),
            ));
        }
        Ok(response.json::<T>().await?)
    }
}

pub fn list_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.page.max(1).to_string()),
        ("page_size", query.page_size.max(1).to_string()),
    ];
    if let StatusFilter::Only(status) = query.status_filter {
        params.push(("status", status.as_str().to_string()));
    }
    // newest-first is the service's own default order
    if query.sort_key != SortKey::DateNewest {
        params.push(("ordering", query.sort_key.ordering_token().to_string()));
    }
    params
}

#[async_trait]
impl JobsApi for ApiClient {
    async fn list_jobs(&self, query: &ListQuery) -> Result<Page<Job>, ApiError> {
        let params = list_params(query);
        let response = self
            .execute(Method::GET, JOBS_PATH, |req| req.query(&params))
            .await?;

        match Self::read_json::<JobListResponse>(response).await? {
            JobListResponse::Paginated(body) => Ok(Page {
                items: body.results,
                total_count: body.count,
            }),
            JobListResponse::Bare(all) => {
                debug!(jobs = all.len(), "unpaginated job list, deriving page locally");
                Ok(paginate_locally(all, query))
            }
        }
    }

    async fn create_job(&self, name: &JobName) -> Result<Job, ApiError> {
        let body = CreateJobRequest {
            name: name.as_str(),
        };
        let response = self
            .execute(Method::POST, JOBS_PATH, |req| req.json(&body))
            .await?;
        Self::read_json(response).await
    }

    async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<Job, ApiError> {
        let body = UpdateStatusRequest {
            status_type: status,
        };
        let response = self
            .execute(Method::PATCH, &Self::job_path(id), |req| req.json(&body))
            .await?;
        Self::read_json(response).await
    }

    async fn delete_job(&self, id: JobId) -> Result<(), ApiError> {
        // success is the status line alone; the body is never read
        self.execute(Method::DELETE, &Self::job_path(id), |req| req)
            .await?;
        Ok(())
    }

    async fn status_history(&self, id: JobId) -> Result<Vec<StatusHistoryItem>, ApiError> {
        let path = format!("{JOBS_PATH}{id}/status-history");
        let response = self.execute(Method::GET, &path, |req| req).await?;
        Self::read_json(response).await
    }
}
