//! Configuration management for dataview using the prefer crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetcher::DEFAULT_MAX_SAFE_SIZE;
use crate::pager::DEFAULT_PAGE_SIZE;
use crate::source::http::USER_AGENT;

/// Default server address of the data API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Folders listed when none are configured.
pub const DEFAULT_FOLDERS: [&str; 2] = ["coupon", "market"];

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the data API.
    pub base_url: String,
    /// Folders shown in the tree.
    pub folders: Vec<String>,
    /// Chars per page.
    pub page_size: usize,
    /// Files larger than this (bytes) need confirmation before download.
    pub max_safe_size: u64,
    /// Connect and per-read idle timeout in seconds.
    pub request_timeout: u64,
    /// User agent for HTTP requests.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            folders: DEFAULT_FOLDERS.iter().map(|f| f.to_string()).collect(),
            page_size: DEFAULT_PAGE_SIZE,
            max_safe_size: DEFAULT_MAX_SAFE_SIZE,
            request_timeout: 30,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub folders: Option<Vec<String>>,
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Confirmation threshold in bytes.
    #[serde(default)]
    pub max_safe_size: Option<u64>,
    /// Connect and per-read idle timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers dataview config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("dataview").await {
            Ok(pref_config) => {
                let base_url: Option<String> = pref_config.get("base_url").ok();
                let folders: Option<Vec<String>> = pref_config.get("folders").ok();
                let page_size: Option<usize> = pref_config.get("page_size").ok();
                let max_safe_size: Option<u64> = pref_config.get("max_safe_size").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let user_agent: Option<String> = pref_config.get("user_agent").ok();

                Config {
                    base_url,
                    folders,
                    page_size,
                    max_safe_size,
                    request_timeout,
                    user_agent,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(ref folders) = self.folders {
            if !folders.is_empty() {
                settings.folders = folders.clone();
            }
        }
        if let Some(page_size) = self.page_size.filter(|size| *size > 0) {
            settings.page_size = page_size;
        }
        if let Some(max_safe_size) = self.max_safe_size {
            settings.max_safe_size = max_safe_size;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.page_size, 100_000);
        assert_eq!(settings.max_safe_size, 5 * 1024 * 1024);
        assert_eq!(settings.folders, vec!["coupon", "market"]);
        assert!(settings.user_agent.starts_with("dataview/"));
    }

    #[test]
    fn test_apply_overrides_only_set_values() {
        let config = Config {
            base_url: Some("http://data.internal:8080".to_string()),
            page_size: Some(5_000),
            request_timeout: Some(5),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);

        assert_eq!(settings.base_url, "http://data.internal:8080");
        assert_eq!(settings.page_size, 5_000);
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.max_safe_size, DEFAULT_MAX_SAFE_SIZE);
        assert_eq!(settings.folders, vec!["coupon", "market"]);
    }

    #[test]
    fn test_apply_ignores_degenerate_values() {
        let config = Config {
            folders: Some(Vec::new()),
            page_size: Some(0),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{"base_url": "http://localhost:9000", "folders": ["market"], "max_safe_size": 1024}"#,
        )
        .unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);
        assert_eq!(settings.folders, vec!["market"]);
        assert_eq!(settings.max_safe_size, 1024);
    }
}
