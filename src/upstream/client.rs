//! A single (track, class) fetch against the external leaderboard service.
//!
//! Two requests per fetch: a human-facing page GET to establish session
//! cookies, then an XHR-flavored GET against the listing endpoint. Grounded
//! on the teacher's `inline_css::css_downloader` request shape, adapted
//! from a fire-and-forget download to a cancellation-aware, two-step
//! session fetch.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;

use crate::cache::RawEntry;
use crate::cancellation::CancelHandle;
use crate::error::UpstreamError;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const POOL_MAX_IDLE_PER_HOST: usize = 2;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn page_url(&self, track_id: &str, class_id: &str) -> String {
        format!(
            "{}/leaderboards?track={track_id}&car_class={class_id}",
            self.base_url
        )
    }

    fn listing_url(&self) -> String {
        format!("{}/leaderboards/ajax", self.base_url)
    }

    /// Fetch the full ranking for one (track, class) combination.
    ///
    /// Returns the raw entries in upstream order and the wall-clock elapsed
    /// time, or an [`UpstreamError`]. Races the fetch against `cancel` so a
    /// cancelled refresh aborts in-flight I/O promptly.
    pub async fn fetch(
        &self,
        cancel: &CancelHandle,
        track_id: &str,
        class_id: &str,
        timeout: Duration,
    ) -> Result<(Vec<RawEntry>, Duration), UpstreamError> {
        if track_id.is_empty() || class_id.is_empty() {
            return Err(UpstreamError::Decode(
                "track_id and class_id must be non-empty".into(),
            ));
        }
        let started = Instant::now();
        tokio::select! {
            result = self.fetch_inner(track_id, class_id, timeout) => {
                result.map(|entries| (entries, started.elapsed()))
            }
            () = cancel.cancelled() => Err(UpstreamError::Cancelled),
        }
    }

    async fn fetch_inner(
        &self,
        track_id: &str,
        class_id: &str,
        timeout: Duration,
    ) -> Result<Vec<RawEntry>, UpstreamError> {
        let page_url = self.page_url(track_id, class_id);

        let session_resp = tokio::time::timeout(timeout, self.http.get(&page_url).send())
            .await
            .map_err(|_| UpstreamError::Timeout)?
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        if !session_resp.status().is_success() {
            return Err(UpstreamError::Http(session_resp.status().as_u16()));
        }

        let listing_resp = tokio::time::timeout(
            timeout,
            self.http
                .get(self.listing_url())
                .query(&[
                    ("track", track_id),
                    ("car_class", class_id),
                    ("start", "0"),
                    ("count", "1500"),
                ])
                .header(REFERER, &page_url)
                .send(),
        )
        .await
        .map_err(|_| UpstreamError::Timeout)?
        .map_err(|e| UpstreamError::Network(e.to_string()))?;
        if !listing_resp.status().is_success() {
            return Err(UpstreamError::Http(listing_resp.status().as_u16()));
        }

        let body: serde_json::Value = listing_resp
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let results = body
            .pointer("/context/c/results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| UpstreamError::Decode("missing context.c.results".into()))?;

        Ok(results
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect())
    }

    /// Release idle pooled connections. Best-effort: the underlying pool is
    /// torn down once every clone of the client is dropped.
    pub fn close(self) {
        drop(self);
    }
}
