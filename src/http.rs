use crate::config::Config;
use crate::errors::{BvbError, Result};
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thin wrapper around `reqwest::Client` for the exchange endpoints.
///
/// Requests are issued strictly one at a time with a minimum interval
/// between them. A response is rejected only when its status is not
/// successful and its body is empty; the exchange serves some error
/// pages with status 200 and some payloads with odd statuses, so the
/// body is the authoritative signal.
pub(crate) struct HttpClient {
    client: Client,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(BvbError::Request)?;

        Ok(Self {
            client,
            request_interval: config.request_interval,
            last_request: Mutex::new(None),
        })
    }

    async fn wait_for_rate_limit(&self) {
        let now = Instant::now();
        let should_wait = {
            let mut last = self.last_request.lock().unwrap();
            let should_wait = match *last {
                Some(instant) => {
                    let elapsed = instant.elapsed();
                    if elapsed < self.request_interval {
                        Some(self.request_interval - elapsed)
                    } else {
                        None
                    }
                }
                None => None,
            };
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("waiting {:?} before next request", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    pub async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String> {
        self.send(self.client.get(url), url, referer).await
    }

    pub async fn get_text_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<String> {
        self.send(self.client.get(url).query(query), url, referer)
            .await
    }

    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        referer: Option<&str>,
    ) -> Result<String> {
        self.send(self.client.post(url).form(fields), url, referer)
            .await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String> {
        self.wait_for_rate_limit().await;

        let request = match referer {
            Some(referer) => request.header("Referer", referer),
            None => request,
        };

        let response = request.send().await.map_err(BvbError::Request)?;
        Self::validate(url, response).await
    }

    async fn validate(url: &str, response: Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() && text.is_empty() {
            return Err(BvbError::Transport {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(text)
    }
}
