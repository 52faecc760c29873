//! Thin HTTP client for the FartMap API.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use fartmap_common::{BoundingBox, Event, EventSubmission};
use fartmap_stats::{HotZone, Leaderboard, ProfileStats, TimeWindow};

const API_KEY_HEADER: &str = "x-api-key";
const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub struct FartMapClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    event: Event,
}

#[derive(Deserialize)]
struct ClearResponse {
    cleared: usize,
}

impl FartMapClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API URL cannot take a path: {base_url}");
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    pub async fn submit(&self, submission: &EventSubmission) -> Result<Event> {
        let response = self
            .authed(self.http.post(self.endpoint(&["events"])?))
            .json(submission)
            .send()
            .await
            .context("failed to reach the FartMap API")?;
        let body: SubmitResponse = parse(response).await?;
        Ok(body.event)
    }

    pub async fn events(&self, window: TimeWindow) -> Result<Vec<Event>> {
        self.get_json(&["events"], &[("window", window.to_string())])
            .await
    }

    pub async fn hot_zones(
        &self,
        window: TimeWindow,
        bbox: Option<&BoundingBox>,
    ) -> Result<Vec<HotZone>> {
        let mut query = vec![("window", window.to_string())];
        if let Some(b) = bbox {
            query.push(("bbox", format!("{},{},{},{}", b.south, b.west, b.north, b.east)));
        }
        self.get_json(&["hot-zones"], &query).await
    }

    pub async fn leaderboard(&self, window: TimeWindow, device_id: &str) -> Result<Leaderboard> {
        self.get_json(
            &["leaderboard"],
            &[("window", window.to_string()), ("device_id", device_id.to_string())],
        )
        .await
    }

    pub async fn profile(&self, device_id: &str, window: TimeWindow) -> Result<ProfileStats> {
        self.get_json(&["profile", device_id], &[("window", window.to_string())])
            .await
    }

    pub async fn clear(&self, admin_key: &str) -> Result<usize> {
        let response = self
            .authed(self.http.delete(self.endpoint(&["events"])?))
            .header(ADMIN_KEY_HEADER, admin_key)
            .send()
            .await
            .context("failed to reach the FartMap API")?;
        let body: ClearResponse = parse(response).await?;
        Ok(body.cleared)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .authed(self.http.get(self.endpoint(segments)?))
            .query(query)
            .send()
            .await
            .context("failed to reach the FartMap API")?;
        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        anyhow::bail!("API returned {status}: {}", error_message(status, &body));
    }
    response
        .json::<T>()
        .await
        .context("failed to decode API response")
}

/// The `error` field of a JSON error body, or the status text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string())
}
