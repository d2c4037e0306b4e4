// crates/jobdash/src/api/models.rs
use serde::{Deserialize, Serialize};

use crate::jobs::{Job, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedJobResponse {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Job>,
}

/// `GET /api/jobs/` answers with a paginated envelope, or with a bare array
/// on backends that predate pagination.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobListResponse {
    Paginated(PaginatedJobResponse),
    Bare(Vec<Job>),
}

#[derive(Debug, Serialize)]
pub struct CreateJobRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusRequest {
    pub status_type: JobStatus,
}
