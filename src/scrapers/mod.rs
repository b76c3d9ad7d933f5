pub mod details;
pub mod headers;
pub mod history;
pub mod listing;

use crate::config::Config;
use crate::errors::Result;
use crate::http::HttpClient;

/// Scraper for the Bucharest Stock Exchange public endpoints.
///
/// One instance holds one HTTP client; every operation is a plain
/// `async fn` that performs its requests sequentially and returns
/// in-memory domain objects. Nothing is cached or persisted.
pub struct BvbScraper {
    pub(crate) http: HttpClient,
}

impl BvbScraper {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::new())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(&config)?,
        })
    }
}
