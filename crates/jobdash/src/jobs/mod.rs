pub mod model;
pub mod view;

pub use model::{
    status_color, status_label, total_pages, BadgeColor, Job, JobId, JobName, JobStatus,
    ListQuery, Page, SortKey, StatusFilter, StatusHistoryItem, DEFAULT_PAGE_SIZE,
};
pub use view::{derive_view, paginate_locally, sort_jobs, PageInfo};
