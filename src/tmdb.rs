use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("TMDB request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("TMDB returned {status} for {path}")]
    Status { status: reqwest::StatusCode, path: String },
}

/// Movie detail as returned by `GET /movie/{id}`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub runtime: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<Video>,
}

/// External movie metadata source used by the import proxy.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Title search; the provider's JSON is handed back untouched.
    async fn search_movies(&self, query: &str) -> Result<serde_json::Value, ProviderError>;

    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, ProviderError>;

    async fn movie_videos(&self, movie_id: i64) -> Result<Vec<Video>, ProviderError>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, api_key, base_url, limiter }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!(path = %path, "TMDB request");

        let resp = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status { status, path: path.to_string() });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_movies(&self, query: &str) -> Result<serde_json::Value, ProviderError> {
        self.get("/search/movie", &[("query", query)]).await
    }

    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, ProviderError> {
        self.get(&format!("/movie/{movie_id}"), &[]).await
    }

    async fn movie_videos(&self, movie_id: i64) -> Result<Vec<Video>, ProviderError> {
        let resp: VideosResponse = self.get(&format!("/movie/{movie_id}/videos"), &[]).await?;
        Ok(resp.results)
    }
}
