pub mod api;
pub mod config;
pub mod controllers;
pub mod dashboard;
pub mod jobs;
pub mod logging;

pub use dashboard::Dashboard;
