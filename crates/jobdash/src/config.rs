// Config is the one place runtime settings come from.
// Values are read from the environment (and a .env file when present) into a
// typed struct so the rest of the crate never touches raw strings.

use crate::jobs::DEFAULT_PAGE_SIZE;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub history_enabled: bool,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_base_url = first_set(&["JOBDASH_API_BASE_URL", "API_BASE_URL"])
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("JOBDASH_API_BASE_URL is missing"))?;

        let page_size = first_set(&["JOBDASH_PAGE_SIZE", "PAGE_SIZE"])
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, 100);

        let request_timeout_secs = first_set(&["JOBDASH_REQUEST_TIMEOUT_SECS"])
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(10)
            .clamp(1, 120);

        let history_enabled = first_set(&["JOBDASH_HISTORY_ENABLED"])
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let log_filter =
            first_set(&["JOBDASH_LOG", "RUST_LOG"]).unwrap_or_else(|| "info".to_string());

        Ok(Self {
            api_base_url,
            page_size,
            request_timeout_secs,
            history_enabled,
            log_filter,
        })
    }
}

/// First non-blank value among `keys`, in order.
fn first_set(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.trim().is_empty())
}

fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| raw.eq_ignore_ascii_case(t))
}
