// crates/jobdash/src/dashboard.rs
use std::sync::Arc;

use crate::api::{ApiClient, JobsApi};
use crate::config::Config;
use crate::controllers::{
    LifecycleController, ListController, NotificationReceiver, StatusHistoryPanel,
};
use crate::jobs::{JobId, ListQuery};

/// The controllers wired to one API, as a view layer uses them.
pub struct Dashboard {
    pub api: Arc<dyn JobsApi>,
    pub list: Arc<ListController>,
    pub lifecycle: LifecycleController,
    pub notifications: NotificationReceiver,
    history_enabled: bool,
}

impl Dashboard {
    pub fn new(api: Arc<dyn JobsApi>, query: ListQuery, history_enabled: bool) -> Self {
        let list = Arc::new(ListController::with_query(api.clone(), query));
        let (lifecycle, notifications) = LifecycleController::new(api.clone(), list.clone());
        Self {
            api,
            list,
            lifecycle,
            notifications,
            history_enabled,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let client = ApiClient::from_config(cfg)?;
        Ok(Self::new(
            Arc::new(client),
            ListQuery::with_page_size(cfg.page_size),
            cfg.history_enabled,
        ))
    }

    pub fn history_panel(&self, job_id: JobId) -> StatusHistoryPanel {
        StatusHistoryPanel::with_enabled(self.api.clone(), job_id, self.history_enabled)
    }
}
