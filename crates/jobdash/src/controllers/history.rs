// crates/jobdash/src/controllers/history.rs
//
// Expandable per-job status history. The endpoint is optional on the
// backend, so a missing endpoint renders as an inline note rather than an
// error, and collapsing the panel cancels an in-flight fetch.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiError, JobsApi};
use crate::jobs::{JobId, StatusHistoryItem};

pub const HISTORY_UNAVAILABLE_MESSAGE: &str = "Status history is not available for this job yet.";
pub const HISTORY_EMPTY_MESSAGE: &str = "No status history yet.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HistoryContent {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<StatusHistoryItem>),
    Unavailable(String),
    Failed(String),
}

#[derive(Default)]
struct PanelInner {
    open: bool,
    content: HistoryContent,
    // bumped on collapse; a fetch only lands if its generation is current
    generation: u64,
    cancel: Option<CancellationToken>,
}

pub struct StatusHistoryPanel {
    api: Arc<dyn JobsApi>,
    job_id: JobId,
    enabled: bool,
    inner: Mutex<PanelInner>,
}

fn is_missing_endpoint(e: &ApiError) -> bool {
    matches!(e.status(), Some(404 | 405 | 501))
}

impl StatusHistoryPanel {
    pub fn new(api: Arc<dyn JobsApi>, job_id: JobId) -> Self {
        Self::with_enabled(api, job_id, true)
    }

    /// A disabled panel reports the history as unavailable without any request.
    pub fn with_enabled(api: Arc<dyn JobsApi>, job_id: JobId, enabled: bool) -> Self {
        Self {
            api,
            job_id,
            enabled,
            inner: Mutex::new(PanelInner::default()),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    pub fn content(&self) -> HistoryContent {
        self.inner.lock().content.clone()
    }

    /// Open the panel and fetch the history the first time.
    ///
    /// Later expands reuse what was loaded. Returns once the fetch settles or
    /// is cancelled by `collapse`.
    pub async fn expand(&self) {
        let (generation, token) = {
            let mut inner = self.inner.lock();
            inner.open = true;

            if inner.content != HistoryContent::NotLoaded {
                return;
            }
            if !self.enabled {
                inner.content = HistoryContent::Unavailable(HISTORY_UNAVAILABLE_MESSAGE.into());
                return;
            }

            let token = CancellationToken::new();
            inner.content = HistoryContent::Loading;
            inner.cancel = Some(token.clone());
            (inner.generation, token)
        };

        let mut pending = PendingFetch {
            panel: self,
            generation,
            settled: false,
        };

        let result = tokio::select! {
            _ = token.cancelled() => Err(ApiError::Aborted),
            r = self.api.status_history(self.job_id) => r,
        };
        pending.settled = true;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(job_id = self.job_id, "status history fetch superseded");
            return;
        }
        inner.cancel = None;

        inner.content = match result {
            Ok(items) => HistoryContent::Loaded(items),
            Err(ApiError::Aborted) => {
                debug!(job_id = self.job_id, "status history fetch aborted");
                HistoryContent::NotLoaded
            }
            Err(e) if is_missing_endpoint(&e) => {
                debug!(job_id = self.job_id, error = %e, "status history endpoint unavailable");
                HistoryContent::Unavailable(HISTORY_UNAVAILABLE_MESSAGE.into())
            }
            Err(e) => {
                debug!(job_id = self.job_id, error = %e, "status history fetch failed");
                HistoryContent::Failed(
                    e.user_message()
                        .unwrap_or_else(|| "Failed to load status history".into()),
                )
            }
        };
    }

    /// Close the panel. An in-flight fetch is cancelled and leaves no trace,
    /// so the next expand fetches again.
    pub fn collapse(&self) {
        let mut inner = self.inner.lock();
        inner.open = false;
        if let Some(token) = inner.cancel.take() {
            token.cancel();
            inner.generation += 1;
            inner.content = HistoryContent::NotLoaded;
        }
    }

    /// Lines to show inside the open panel.
    pub fn render(&self) -> Vec<String> {
        let inner = self.inner.lock();
        if !inner.open {
            return Vec::new();
        }
        match &inner.content {
            HistoryContent::NotLoaded => Vec::new(),
            HistoryContent::Loading => vec!["Loading...".to_string()],
            HistoryContent::Loaded(items) if items.is_empty() => {
                vec![HISTORY_EMPTY_MESSAGE.to_string()]
            }
            HistoryContent::Loaded(items) => items
                .iter()
                .map(|h| format!("{}  {}", h.status, h.changed_at.to_rfc3339()))
                .collect(),
            HistoryContent::Unavailable(msg) | HistoryContent::Failed(msg) => vec![msg.clone()],
        }
    }
}

/// Resets a fetch whose `expand` future was dropped before it settled, so
/// the panel is not stuck in `Loading`.
struct PendingFetch<'a> {
    panel: &'a StatusHistoryPanel,
    generation: u64,
    settled: bool,
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.panel.inner.lock();
        if inner.generation == self.generation && inner.content == HistoryContent::Loading {
            inner.content = HistoryContent::NotLoaded;
            inner.cancel = None;
        }
    }
}
