use std::time::Duration;

/// Scraper settings. All requests share one timeout and a minimum
/// interval between consecutive calls to the exchange.
#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Duration,
    pub request_interval: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_interval: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
