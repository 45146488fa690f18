use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5055";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PREFERRED_PROVIDER: &str = "gemini";

/// Process-wide settings, resolved once before the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub password: Option<String>,
    pub timeout: Duration,
    pub preferred_provider: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            password: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preferred_provider: DEFAULT_PREFERRED_PROVIDER.to_string(),
        }
    }
}

impl Config {
    pub fn new(base_url: &str, password: Option<String>) -> Self {
        Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            password: password.filter(|p| !p.is_empty()),
            ..Config::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_preferred_provider(mut self, provider: &str) -> Self {
        self.preferred_provider = provider.to_string();
        self
    }

    /// Full URL for an endpoint path such as `/notebooks`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}
