// crates/jobdash/src/jobs/view.rs
//
// Client-side derivation of a displayed page: filter -> sort -> paginate.
// The server normally does all three, but the ordering rules here are the
// reference ones and are reapplied to every fetched page.

use std::cmp::Ordering;

use crate::jobs::model::{total_pages, Job, JobStatus, ListQuery, Page, SortKey, StatusFilter};

/// Case-folded comparison first, raw comparison as the tie-break, so "apple"
/// sorts before "Banana" and "a" before "A" deterministically.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

fn status_rank(status: Option<JobStatus>) -> u8 {
    // missing status orders like PENDING (display still says UNKNOWN)
    status.unwrap_or(JobStatus::Pending).sort_rank()
}

pub fn compare_jobs(a: &Job, b: &Job, key: SortKey) -> Ordering {
    match key {
        SortKey::NameAsc => locale_cmp(&a.name, &b.name),
        SortKey::NameDesc => locale_cmp(&b.name, &a.name),
        SortKey::DateNewest => b.created_at.cmp(&a.created_at),
        SortKey::DateOldest => a.created_at.cmp(&b.created_at),
        SortKey::Status => status_rank(a.current_status).cmp(&status_rank(b.current_status)),
    }
}

/// Stable sort: equal keys keep their incoming relative order.
pub fn sort_jobs(jobs: &mut [Job], key: SortKey) {
    jobs.sort_by(|a, b| compare_jobs(a, b, key));
}

pub fn filter_jobs(jobs: Vec<Job>, filter: StatusFilter) -> Vec<Job> {
    jobs.into_iter()
        .filter(|j| filter.matches(j.current_status))
        .collect()
}

/// Filter and order without paginating.
pub fn derive_view(jobs: &[Job], filter: StatusFilter, key: SortKey) -> Vec<Job> {
    let mut out = filter_jobs(jobs.to_vec(), filter);
    sort_jobs(&mut out, key);
    out
}

/// Build one page out of a full, unpaginated job set.
///
/// `total_count` is the number of jobs that passed the filter. A page past
/// the end yields no items rather than an error.
pub fn paginate_locally(all: Vec<Job>, query: &ListQuery) -> Page<Job> {
    let mut matching = filter_jobs(all, query.status_filter);
    sort_jobs(&mut matching, query.sort_key);

    let total_count = matching.len() as u64;
    let page_size = query.page_size.max(1) as usize;
    let start = (query.page.max(1) as usize - 1).saturating_mul(page_size);

    let items = matching.into_iter().skip(start).take(page_size).collect();

    Page { items, total_count }
}

/// Pagination footer state for the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl PageInfo {
    pub fn new(query: &ListQuery, total_count: u64) -> Self {
        Self {
            page: query.page,
            page_size: query.page_size,
            total_pages: total_pages(total_count, query.page_size),
            total_count,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages.max(1))
    }

    pub fn summary(&self) -> String {
        format!(
            "Page {} of {} ({} jobs per page)",
            self.page, self.total_pages, self.page_size
        )
    }
}
