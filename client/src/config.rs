use std::time::Duration;

/// Default backend address used by the mobile build.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
/// Products requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Settings for one inventory session and its backend connections.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend root, without a trailing slash.
    pub base_url: String,
    /// WebSocket URL of the push channel. `None` disables realtime updates.
    pub push_url: Option<String>,
    pub page_size: u32,
    /// Period of the countdown refresh tick.
    pub refresh_period: Duration,
    /// First reconnect delay after the push channel drops.
    pub reconnect_min: Duration,
    /// Reconnect delay ceiling.
    pub reconnect_max: Duration,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            push_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            refresh_period: Duration::from_secs(1),
            reconnect_min: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_push_url(mut self, push_url: impl Into<String>) -> Self {
        self.push_url = Some(push_url.into());
        self
    }

    /// Derive the push URL from the base URL (`http` → `ws`, path `/push`).
    pub fn default_push_url(&self) -> String {
        let ws = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws}/push")
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
