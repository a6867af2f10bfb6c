use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub request_timeout: Duration,
    pub max_response_bytes: usize,
    pub cookie_jar: bool,
    pub allow_secrets_in_url: bool,
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_response_bytes: 10 * 1024 * 1024,
            cookie_jar: true,
            allow_secrets_in_url: false,
            user_agent: concat!("reqflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
