use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::ApiError;

pub type JobId = i64;

/// One tracked job as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // null until the backend has recorded a status row
    pub current_status: Option<JobStatus>,
}

impl Job {
    pub fn status_label(&self) -> &'static str {
        status_label(self.current_status)
    }

    pub fn badge_color(&self) -> BadgeColor {
        status_color(self.current_status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Position used by the `status` sort key. RUNNING sorts first.
    pub fn sort_rank(&self) -> u8 {
        match self {
            JobStatus::Running => 0,
            JobStatus::Pending => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(ApiError::Validation(format!(
                "unknown status '{other}' (expected PENDING, RUNNING, COMPLETED or FAILED)"
            ))),
        }
    }
}

/// Badge text for a possibly-missing status. Never written back to the API.
pub fn status_label(status: Option<JobStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("UNKNOWN")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Gray,
    Blue,
    Green,
    Red,
}

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeColor::Gray => "gray",
            BadgeColor::Blue => "blue",
            BadgeColor::Green => "green",
            BadgeColor::Red => "red",
        }
    }
}

pub fn status_color(status: Option<JobStatus>) -> BadgeColor {
    match status {
        Some(JobStatus::Pending) => BadgeColor::Gray,
        Some(JobStatus::Running) => BadgeColor::Blue,
        Some(JobStatus::Completed) => BadgeColor::Green,
        Some(JobStatus::Failed) => BadgeColor::Red,
        None => BadgeColor::Gray,
    }
}

/// A job name that is already trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobName(String);

impl JobName {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation("Job name cannot be empty.".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: Option<JobStatus>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status == Some(*wanted),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "ALL",
            StatusFilter::Only(s) => s.as_str(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    #[default]
    DateNewest,
    DateOldest,
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::DateNewest,
        SortKey::DateOldest,
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "name-asc",
            SortKey::NameDesc => "name-desc",
            SortKey::DateNewest => "date-newest",
            SortKey::DateOldest => "date-oldest",
            SortKey::Status => "status",
        }
    }

    /// Backend `ordering` query token.
    pub fn ordering_token(&self) -> &'static str {
        match self {
            SortKey::DateNewest => "-created_at",
            SortKey::DateOldest => "created_at",
            SortKey::NameAsc => "name",
            SortKey::NameDesc => "-name",
            SortKey::Status => "current_status",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::DateNewest => "Newest First",
            SortKey::DateOldest => "Oldest First",
            SortKey::NameAsc => "Name (A-Z)",
            SortKey::NameDesc => "Name (Z-A)",
            SortKey::Status => "Status",
        }
    }
}

impl FromStr for SortKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ApiError::Validation(format!("unknown sort key '{}'", s.trim())))
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page/filter/sort parameters for one list fetch. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub status_filter: StatusFilter,
    pub sort_key: SortKey,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            status_filter: StatusFilter::All,
            sort_key: SortKey::DateNewest,
        }
    }
}

impl ListQuery {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

/// `max(1, ceil(total_count / page_size))`
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryItem {
    // the endpoint has no settled id type yet
    pub id: serde_json::Value,
    pub status: String,
    pub changed_at: DateTime<Utc>,
}
