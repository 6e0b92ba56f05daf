use std::sync::Arc;

use sea_orm::{ActiveModelTrait, DbErr, Set};
use tracing::{info, warn};

use crate::{
    cache::{CacheManager, Invalidate, now_sec},
    entities::movie,
    tmdb::{MetadataProvider, MovieDetails, ProviderError, Video},
};

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const BANNER_BASE: &str = "https://image.tmdb.org/t/p/original";
const TRAILER_BASE: &str = "https://www.youtube.com/watch?v=";
const TRAILER_TYPE: &str = "Trailer";
const TRAILER_SITE: &str = "YouTube";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("TMDB API key not configured")]
    NotConfigured,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to store imported movie: {0}")]
    Database(#[from] DbErr),
}

/// Forwards admin searches to the metadata provider and materializes imports.
#[derive(Clone)]
pub struct ImportProxy {
    provider: Arc<dyn MetadataProvider>,
    cache: CacheManager,
}

impl ImportProxy {
    pub fn new(provider: Arc<dyn MetadataProvider>, cache: CacheManager) -> Self {
        Self { provider, cache }
    }

    pub async fn search(&self, query: &str) -> Result<serde_json::Value, ImportError> {
        Ok(self.provider.search_movies(query).await?)
    }

    /// Fetches detail and videos for `movie_id`, then inserts exactly one movie row.
    ///
    /// Importing the same provider id twice stores two rows.
    pub async fn import(
        &self,
        movie_id: i64,
        category_id: Option<i32>,
    ) -> Result<movie::Model, ImportError> {
        let details = self.provider.movie_details(movie_id).await?;
        let videos = self.provider.movie_videos(movie_id).await?;
        let trailer = select_trailer(&videos);
        if trailer.is_none() {
            warn!(movie_id, "no trailer found");
        }

        let inserted = movie_payload(&details, trailer, category_id, now_sec())
            .insert(self.cache.db())
            .await?;
        self.cache.invalidate(Invalidate::Movies).await;

        info!(movie_id, id = inserted.id, title = %inserted.title, "imported movie");
        Ok(inserted)
    }
}

/// First video that is a trailer hosted on the expected site.
pub fn select_trailer(videos: &[Video]) -> Option<&Video> {
    videos.iter().find(|v| v.kind == TRAILER_TYPE && v.site == TRAILER_SITE)
}

/// Year from the part of `release_date` before the first hyphen.
pub fn release_year(release_date: Option<&str>) -> Option<i32> {
    release_date?.split('-').next()?.trim().parse().ok()
}

pub fn movie_payload(
    details: &MovieDetails,
    trailer: Option<&Video>,
    category_id: Option<i32>,
    created_at: i64,
) -> movie::ActiveModel {
    movie::ActiveModel {
        title: Set(details.title.clone()),
        description: Set(details.overview.clone()),
        poster_url: Set(details.poster_path.as_ref().map(|p| format!("{POSTER_BASE}{p}"))),
        banner_url: Set(details.backdrop_path.as_ref().map(|p| format!("{BANNER_BASE}{p}"))),
        trailer_url: Set(trailer.map(|v| format!("{TRAILER_BASE}{}", v.key))),
        download_url: Set(None),
        year: Set(release_year(details.release_date.as_deref())),
        rating: Set(details.vote_average),
        duration: Set(details.runtime),
        views: Set(0),
        category_id: Set(category_id),
        created_at: Set(created_at),
        ..Default::default()
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use super::*;

    /// In-memory provider recording the calls it receives.
    #[derive(Default)]
    pub struct FakeProvider {
        pub details: MovieDetails,
        pub videos: Vec<Video>,
        pub fail_videos: bool,
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for FakeProvider {
        async fn search_movies(&self, query: &str) -> Result<serde_json::Value, ProviderError> {
            self.calls.lock().unwrap().push(format!("search:{query}"));
            Ok(serde_json::json!({
                "page": 1,
                "results": [{ "id": self.details.id, "title": self.details.title }],
                "total_results": 1
            }))
        }

        async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, ProviderError> {
            self.calls.lock().unwrap().push(format!("details:{movie_id}"));
            Ok(self.details.clone())
        }

        async fn movie_videos(&self, movie_id: i64) -> Result<Vec<Video>, ProviderError> {
            self.calls.lock().unwrap().push(format!("videos:{movie_id}"));
            if self.fail_videos {
                return Err(ProviderError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    path: format!("/movie/{movie_id}/videos"),
                });
            }
            Ok(self.videos.clone())
        }
    }

    pub fn video(kind: &str, site: &str, key: &str) -> Video {
        Video { key: key.to_string(), site: site.to_string(), kind: kind.to_string() }
    }

    pub fn matrix() -> MovieDetails {
        MovieDetails {
            id: 603,
            title: "The Matrix".to_string(),
            overview: Some("A hacker learns the truth.".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: Some("/backdrop.jpg".to_string()),
            release_date: Some("1999-03-30".to_string()),
            vote_average: Some(8.2),
            runtime: Some(136),
        }
    }
}
