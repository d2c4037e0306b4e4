// crates/jobdash/src/controllers/lifecycle.rs
//
// Create / status-change / delete orchestration. Per-job card state (status
// editor, delete prompt) lives in a map keyed by job id so cards never
// interfere with each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{ApiError, JobsApi};
use crate::controllers::list::ListController;
use crate::controllers::notify::{Notification, NotificationReceiver, NotificationSender};
use crate::jobs::{Job, JobId, JobName, JobStatus};

pub const DELETE_FAILED_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing { pending_status: JobStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeletePrompt {
    #[default]
    Closed,
    Open { job_name: String },
    // confirmed; the DELETE is in flight
    Deleting { job_name: String },
}

impl DeletePrompt {
    pub fn message(&self) -> Option<String> {
        match self {
            DeletePrompt::Closed | DeletePrompt::Deleting { .. } => None,
            DeletePrompt::Open { job_name } => Some(format!(
                "Are you sure you want to delete \"{job_name}\"? This action cannot be undone."
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardState {
    pub edit: EditState,
    pub delete: DeletePrompt,
}

impl CardState {
    fn is_idle(&self) -> bool {
        self.edit == EditState::Viewing && self.delete == DeletePrompt::Closed
    }
}

/// Input for the create form. The name is kept on failure so it can be
/// resubmitted.
#[derive(Debug, Clone, Default)]
pub struct JobForm {
    pub name: String,
    pub submitting: bool,
}

impl JobForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submitting: false,
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.name.trim().is_empty()
    }
}

pub struct LifecycleController {
    api: Arc<dyn JobsApi>,
    list: Arc<ListController>,
    cards: Mutex<HashMap<JobId, CardState>>,
    last_error: Mutex<Option<ApiError>>,
    notifications: NotificationSender,
}

impl LifecycleController {
    pub fn new(api: Arc<dyn JobsApi>, list: Arc<ListController>) -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctl = Self {
            api,
            list,
            cards: Mutex::new(HashMap::new()),
            last_error: Mutex::new(None),
            notifications: tx,
        };
        (ctl, rx)
    }

    pub fn list(&self) -> &Arc<ListController> {
        &self.list
    }

    pub fn card(&self, job_id: JobId) -> CardState {
        self.cards.lock().get(&job_id).cloned().unwrap_or_default()
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.last_error.lock().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock() = None;
    }

    fn update_card<R>(&self, job_id: JobId, f: impl FnOnce(&mut CardState) -> R) -> R {
        let mut cards = self.cards.lock();
        let card = cards.entry(job_id).or_default();
        let out = f(card);
        if card.is_idle() {
            cards.remove(&job_id);
        }
        out
    }

    fn emit(&self, n: Notification) {
        // nobody listening is fine
        let _ = self.notifications.send(n);
    }

    fn record_failure(&self, title: &str, e: &ApiError) {
        if e.is_aborted() {
            return;
        }
        warn!(error = %e, "{title}");
        *self.last_error.lock() = Some(e.clone());
        if let Some(msg) = e.user_message() {
            self.emit(Notification::error(title, msg));
        }
    }

    fn lookup(&self, job_id: JobId) -> Result<Job, ApiError> {
        self.list
            .find_job(job_id)
            .ok_or_else(|| ApiError::Validation(format!("job {job_id} is not on the current page")))
    }

    // ----------------------------
    // Create
    // ----------------------------

    /// Validate, create, then show page 1 so the new job is visible.
    ///
    /// Blank names are rejected before any request is made.
    pub async fn create(&self, raw_name: &str) -> Result<Job, ApiError> {
        let name = match JobName::parse(raw_name) {
            Ok(name) => name,
            Err(e) => {
                self.record_failure("Failed to create job.", &e);
                return Err(e);
            }
        };

        let job = match self.api.create_job(&name).await {
            Ok(job) => job,
            Err(e) => {
                self.record_failure("Failed to create job.", &e);
                return Err(e);
            }
        };
        info!(job_id = job.id, name = %job.name, "job created");
        self.clear_error();

        // list failure is stored on the list controller; the create stands
        let _ = self.list.show_first_page().await;
        Ok(job)
    }

    /// Form wrapper around `create`: clears the input only on success.
    pub async fn submit(&self, form: &mut JobForm) -> Result<Job, ApiError> {
        if !form.can_submit() {
            return Err(ApiError::Validation("Job name cannot be empty.".into()));
        }

        form.submitting = true;
        let result = self.create(&form.name).await;
        form.submitting = false;

        if result.is_ok() {
            form.name.clear();
        }
        result
    }

    // ----------------------------
    // Status edit: Viewing -> Editing -> Viewing
    // ----------------------------

    /// Open the status editor, seeded from the job's current status
    /// (a job without one starts at PENDING).
    pub fn begin_edit_status(&self, job_id: JobId) -> Result<JobStatus, ApiError> {
        let job = self.lookup(job_id)?;
        let pending_status = job.current_status.unwrap_or(JobStatus::Pending);
        self.update_card(job_id, |c| c.edit = EditState::Editing { pending_status });
        Ok(pending_status)
    }

    /// Change the selection of an open editor. Does nothing when not editing.
    pub fn select_pending_status(&self, job_id: JobId, status: JobStatus) {
        self.update_card(job_id, |c| {
            if let EditState::Editing { pending_status } = &mut c.edit {
                *pending_status = status;
            }
        });
    }

    pub fn pending_status(&self, job_id: JobId) -> Option<JobStatus> {
        match self.card(job_id).edit {
            EditState::Editing { pending_status } => Some(pending_status),
            EditState::Viewing => None,
        }
    }

    /// Submit `status`. The editor closes before the request goes out and
    /// stays closed on failure, so a second confirm finds no open editor and
    /// is refused without a request.
    pub async fn confirm_edit_status(
        &self,
        job_id: JobId,
        status: JobStatus,
    ) -> Result<Job, ApiError> {
        let was_editing = self.update_card(job_id, |c| {
            std::mem::take(&mut c.edit) != EditState::Viewing
        });
        if !was_editing {
            return Err(ApiError::Validation(format!(
                "no status editor is open for job {job_id}"
            )));
        }

        match self.api.update_job_status(job_id, status).await {
            Ok(job) => {
                info!(job_id, status = %status, "job status updated");
                self.clear_error();
                let _ = self.list.refresh().await;
                Ok(job)
            }
            Err(e) => {
                self.record_failure("Failed to update status.", &e);
                Err(e)
            }
        }
    }

    pub fn cancel_edit_status(&self, job_id: JobId) {
        self.update_card(job_id, |c| c.edit = EditState::Viewing);
    }

    // ----------------------------
    // Delete: Closed -> Open -> Deleting -> Closed
    // ----------------------------

    /// Open the confirmation prompt. Re-requesting an open prompt keeps it
    /// open; a delete already in flight is returned unchanged.
    pub fn request_delete(&self, job_id: JobId) -> Result<DeletePrompt, ApiError> {
        let job = self.lookup(job_id)?;
        let prompt = self.update_card(job_id, |c| {
            if !matches!(c.delete, DeletePrompt::Deleting { .. }) {
                c.delete = DeletePrompt::Open { job_name: job.name };
            }
            c.delete.clone()
        });
        Ok(prompt)
    }

    /// Send the DELETE for an open prompt. Only one confirm per prompt gets
    /// through; the prompt closes once the request settles.
    pub async fn confirm_delete(&self, job_id: JobId) -> Result<(), ApiError> {
        let claimed = self.update_card(job_id, |c| match std::mem::take(&mut c.delete) {
            DeletePrompt::Open { job_name } => {
                c.delete = DeletePrompt::Deleting {
                    job_name: job_name.clone(),
                };
                Some(job_name)
            }
            other => {
                c.delete = other;
                None
            }
        });
        let Some(job_name) = claimed else {
            return Err(ApiError::Validation(format!(
                "no delete confirmation is open for job {job_id}"
            )));
        };

        let in_flight = DeleteInFlight { ctl: self, job_id };
        let result = self.api.delete_job(job_id).await;
        drop(in_flight);

        match result {
            Ok(()) => {
                info!(job_id, name = %job_name, "job deleted");
                self.clear_error();
                let _ = self.list.refresh().await;
                self.emit(Notification::success(
                    "Success",
                    format!("Job \"{job_name}\" deleted successfully"),
                ));
                Ok(())
            }
            Err(e) if e.is_aborted() => Err(e),
            Err(e) => {
                warn!(job_id, error = %e, "job delete failed");
                *self.last_error.lock() = Some(e.clone());
                self.emit(Notification::error("Error", DELETE_FAILED_MESSAGE));
                Err(e)
            }
        }
    }

    /// Close an open prompt. A delete already in flight is not affected.
    pub fn cancel_delete(&self, job_id: JobId) {
        self.update_card(job_id, |c| {
            if let DeletePrompt::Open { .. } = c.delete {
                c.delete = DeletePrompt::Closed;
            }
        });
    }
}

/// Closes a `Deleting` prompt when the request settles or its future is
/// dropped.
struct DeleteInFlight<'a> {
    ctl: &'a LifecycleController,
    job_id: JobId,
}

impl Drop for DeleteInFlight<'_> {
    fn drop(&mut self) {
        self.ctl.update_card(self.job_id, |c| {
            if let DeletePrompt::Deleting { .. } = c.delete {
                c.delete = DeletePrompt::Closed;
            }
        });
    }
}
