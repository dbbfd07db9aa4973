//! Source page fetching.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use rankpages_shared::{RankPagesError, Result};

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("rankpages/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Issues the single GET that retrieves the ranking page.
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| RankPagesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url` and return the body as text.
    ///
    /// Non-2xx statuses are treated as failures. There is no retry here.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("fetching source page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RankPagesError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RankPagesError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RankPagesError::Network(format!("{url}: body read failed: {e}")))?;

        info!(bytes = body.len(), "source page fetched");
        Ok(body)
    }
}
