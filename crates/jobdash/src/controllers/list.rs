// crates/jobdash/src/controllers/list.rs
//
// Owns the current ListQuery and the last successfully fetched page.
// Every fetch is tagged with a sequence number; only the response to the
// most recently issued fetch may touch state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::{ApiError, JobsApi};
use crate::jobs::view::{derive_view, PageInfo};
use crate::jobs::{total_pages, Job, JobId, ListQuery, Page, SortKey, StatusFilter};

#[derive(Debug, Clone)]
pub struct ListState {
    pub query: ListQuery,
    pub page: Page<Job>,
    pub total_pages: u32,
    // true once any fetch has succeeded, so total_pages is known
    pub loaded: bool,
    pub loading: bool,
    pub last_error: Option<ApiError>,
}

impl ListState {
    fn new(query: ListQuery) -> Self {
        Self {
            query,
            page: Page::default(),
            total_pages: 1,
            loaded: false,
            loading: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOutcome {
    Applied,
    Stale,
    // page was past the end and has been clamped; fetch again
    OutOfRange,
}

pub struct ListController {
    api: Arc<dyn JobsApi>,
    state: Mutex<ListState>,
    issued: AtomicU64,
}

/// Clears `loading` when the latest fetch finishes, however it finishes
/// (including the future being dropped mid-request).
struct LoadingGuard<'a> {
    ctl: &'a ListController,
    seq: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.ctl.issued.load(Ordering::SeqCst) == self.seq {
            self.ctl.state.lock().loading = false;
        }
    }
}

impl ListController {
    pub fn new(api: Arc<dyn JobsApi>) -> Self {
        Self::with_query(api, ListQuery::default())
    }

    pub fn with_query(api: Arc<dyn JobsApi>, query: ListQuery) -> Self {
        Self {
            api,
            state: Mutex::new(ListState::new(query)),
            issued: AtomicU64::new(0),
        }
    }

    // ----------------------------
    // Reads
    // ----------------------------

    pub fn snapshot(&self) -> ListState {
        self.state.lock().clone()
    }

    pub fn query(&self) -> ListQuery {
        self.state.lock().query
    }

    /// Jobs exactly as the last successful fetch returned them.
    pub fn items(&self) -> Vec<Job> {
        self.state.lock().page.items.clone()
    }

    /// Fetched jobs with the client-side filter and ordering rules applied.
    pub fn visible_jobs(&self) -> Vec<Job> {
        let st = self.state.lock();
        derive_view(&st.page.items, st.query.status_filter, st.query.sort_key)
    }

    pub fn find_job(&self, id: JobId) -> Option<Job> {
        self.state
            .lock()
            .page
            .items
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    pub fn page_info(&self) -> PageInfo {
        let st = self.state.lock();
        PageInfo::new(&st.query, st.page.total_count)
    }

    pub fn total_pages(&self) -> u32 {
        self.state.lock().total_pages
    }

    pub fn total_count(&self) -> u64 {
        self.state.lock().page.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.state.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().last_error = None;
    }

    // ----------------------------
    // Fetching
    // ----------------------------

    /// Refetch the current query.
    ///
    /// On failure the previous page stays in place and the error is stored
    /// (and returned). A response overtaken by a newer fetch is dropped
    /// silently and reported as `Ok`.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        if self.fetch_once().await? == FetchOutcome::OutOfRange {
            self.fetch_once().await?;
        }
        Ok(())
    }

    async fn fetch_once(&self) -> Result<FetchOutcome, ApiError> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut st = self.state.lock();
            st.loading = true;
            st.last_error = None;
            st.query
        };
        let _loading = LoadingGuard { ctl: self, seq };

        let result = self.api.list_jobs(&query).await;

        let mut st = self.state.lock();
        if self.issued.load(Ordering::SeqCst) != seq {
            debug!(seq, "discarding stale job list response");
            return Ok(FetchOutcome::Stale);
        }

        match result {
            Ok(page) => {
                st.total_pages = total_pages(page.total_count, query.page_size);
                st.page = page;
                st.loaded = true;
                debug!(
                    page = query.page,
                    total_pages = st.total_pages,
                    items = st.page.items.len(),
                    "job list refreshed"
                );

                if st.query.page > st.total_pages {
                    st.query.page = st.total_pages;
                    return Ok(FetchOutcome::OutOfRange);
                }
                Ok(FetchOutcome::Applied)
            }
            Err(e) if e.is_aborted() => Err(e),
            Err(e) => {
                warn!(error = %e, "job list refresh failed, keeping previous page");
                st.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    // ----------------------------
    // Query changes
    // ----------------------------

    pub async fn set_filter(&self, filter: StatusFilter) -> Result<(), ApiError> {
        {
            let mut st = self.state.lock();
            st.query.status_filter = filter;
            st.query.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_sort(&self, key: SortKey) -> Result<(), ApiError> {
        {
            let mut st = self.state.lock();
            st.query.sort_key = key;
            st.query.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_page_size(&self, page_size: u32) -> Result<(), ApiError> {
        {
            let mut st = self.state.lock();
            st.query.page_size = page_size.max(1);
            st.query.page = 1;
        }
        self.refresh().await
    }

    /// Clamps `page` to `[1, total_pages]` of the last fetch.
    ///
    /// Before anything has been fetched the page count is unknown, so only
    /// the lower bound applies; a page past the end is pulled back once the
    /// response reports the real count.
    pub async fn set_page(&self, page: u32) -> Result<(), ApiError> {
        {
            let mut st = self.state.lock();
            st.query.page = if st.loaded {
                page.clamp(1, st.total_pages.max(1))
            } else {
                page.max(1)
            };
        }
        self.refresh().await
    }

    pub async fn next_page(&self) -> Result<(), ApiError> {
        let page = self.query().page.saturating_add(1);
        self.set_page(page).await
    }

    pub async fn previous_page(&self) -> Result<(), ApiError> {
        let page = self.query().page.saturating_sub(1);
        self.set_page(page).await
    }

    /// Jump back to page 1 and refetch, keeping filter and sort.
    pub async fn show_first_page(&self) -> Result<(), ApiError> {
        self.state.lock().query.page = 1;
        self.refresh().await
    }
}
