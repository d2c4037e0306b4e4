pub mod history;
pub mod lifecycle;
pub mod list;
pub mod notify;

pub use history::{HistoryContent, StatusHistoryPanel};
pub use lifecycle::{CardState, DeletePrompt, EditState, JobForm, LifecycleController};
pub use list::{ListController, ListState};
pub use notify::{Notification, NotificationKind, NotificationReceiver};
