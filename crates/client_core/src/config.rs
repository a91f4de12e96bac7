use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::scheduler::DispatchPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub per_page: u32,
    pub find_throttle_ms: Option<u64>,
    pub request_timeout_secs: u64,
    pub event_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9950".into(),
            per_page: 25,
            find_throttle_ms: None,
            request_timeout_secs: 30,
            event_buffer: 1024,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn find_policy(&self) -> DispatchPolicy {
        match self.find_throttle_ms {
            Some(ms) if ms > 0 => DispatchPolicy::Throttle(Duration::from_millis(ms)),
            _ => DispatchPolicy::Latest,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("client.toml"), |key| std::env::var(key).ok())
}

/// Reads `path` when it exists, then applies environment overrides looked up
/// through `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<Settings>(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable client config");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    };

    if let Some(v) = env("CURATOR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__PER_PAGE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.per_page = parsed;
        }
    }

    if let Some(v) = env("APP__FIND_THROTTLE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.find_throttle_ms = Some(parsed);
        }
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}
