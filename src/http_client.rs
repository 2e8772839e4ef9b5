use rand::Rng;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configuration for the outbound HTTP client
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Extra attempts after the first one; zero disables retrying
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 0,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
        }
    }
}

/// reqwest client plus the retry policy used for store page fetches
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Exponential backoff with +/-25% jitter
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_retry_delay_ms;
        let max_delay = self.config.max_retry_delay_ms;
        let delay_ms = base_delay
            .saturating_mul(2u64.saturating_pow(attempt as u32))
            .min(max_delay);

        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }

    /// GET `url` with query parameters, retrying transient failures if configured
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let result = self.client.get(url).query(query).send().await;
            let retries_left = attempt < self.config.max_retries;

            match result {
                Ok(response) if retries_left && Self::is_retryable_status(response.status()) => {
                    log::warn!(
                        target: "play_store",
                        "Received retryable status {} for {}, attempt {}/{}",
                        response.status(),
                        url,
                        attempt + 1,
                        self.config.max_retries + 1
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if retries_left && (e.is_timeout() || e.is_connect()) => {
                    log::warn!(
                        target: "play_store",
                        "Request failed for {}, attempt {}/{}: {}",
                        url,
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            sleep(self.calculate_retry_delay(attempt)).await;
            attempt += 1;
        }
    }
}
