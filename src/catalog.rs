use std::sync::Arc;

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::{Expr, LikeExpr},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    cache::{CacheKey, CacheManager, Cached},
    entities::{category, movie},
    error::AppResult,
};

pub const PAGE_SIZE: u64 = 10;
pub const FEATURED_MIN_RATING: f64 = 8.0;

/// Raw listing query parameters as they arrive in the URL.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub featured: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("year must be a whole number, got {0:?}")]
    Year(String),
    #[error("page must be a positive whole number, got {0:?}")]
    Page(String),
}

/// Validated listing filter. Absent fields apply no constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub featured: bool,
    pub page: u64,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self { search: None, genre: None, year: None, featured: false, page: 1 }
    }
}

impl CatalogFilter {
    pub fn from_query(q: &CatalogQuery) -> Result<Self, FilterError> {
        let year = match present(&q.year) {
            None => None,
            Some(raw) => Some(raw.parse().map_err(|_| FilterError::Year(raw.to_string()))?),
        };

        let page = match present(&q.page) {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(FilterError::Page(raw.to_string())),
            },
        };

        let featured = present(&q.featured).is_some_and(|v| {
            matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
        });

        Ok(Self {
            search: present(&q.search).map(str::to_string),
            genre: present(&q.genre).map(str::to_string),
            year,
            featured,
            page,
        })
    }

    /// Row offset of the first movie on this page, saturating for absurd pages.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(PAGE_SIZE)
    }

    pub fn with_page(&self, page: u64) -> Self {
        Self { page: page.max(1), ..self.clone() }
    }

    /// Switching genre or the featured toggle always starts again from page one.
    pub fn with_genre(&self, genre: Option<&str>) -> Self {
        Self { genre: genre.map(str::to_string), page: 1, ..self.clone() }
    }

    pub fn with_featured(&self, featured: bool) -> Self {
        Self { featured, page: 1, ..self.clone() }
    }

    /// Listing URL reproducing this filter; page 1 is left implicit.
    pub fn href(&self) -> String {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(genre) = &self.genre {
            params.push(format!("genre={}", urlencoding::encode(genre)));
        }
        if let Some(year) = self.year {
            params.push(format!("year={year}"));
        }
        if self.featured {
            params.push("featured=1".to_string());
        }
        if self.page > 1 {
            params.push(format!("page={}", self.page));
        }

        if params.is_empty() { "/".to_string() } else { format!("/?{}", params.join("&")) }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Debug, Default)]
pub struct MoviePage {
    pub movies: Vec<movie::Model>,
    pub total_count: u64,
}

impl MoviePage {
    pub fn page_count(&self) -> u64 {
        page_count(self.total_count)
    }
}

pub fn page_count(total_count: u64) -> u64 {
    total_count.div_ceil(PAGE_SIZE)
}

/// Category id for `slug`, or `None` when no category carries it.
pub fn resolve_genre(categories: &[category::Model], slug: &str) -> Option<i32> {
    categories.iter().find(|c| c.slug == slug).map(|c| c.id)
}

/// Conjunctive movie filter: title substring, featured threshold, category, year.
pub fn compose(filter: &CatalogFilter, category_id: Option<i32>) -> Select<movie::Entity> {
    let mut query = movie::Entity::find();

    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(&search_key(term)));
        query = query.filter(
            Expr::col((movie::Entity, movie::Column::TitleSearch))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    if filter.featured {
        query = query.filter(movie::Column::Rating.gte(FEATURED_MIN_RATING));
    }

    if let Some(category_id) = category_id {
        query = query.filter(movie::Column::CategoryId.eq(category_id));
    }

    if let Some(year) = filter.year {
        query = query.filter(movie::Column::Year.eq(year));
    }

    query
}

/// Case-folded form of a title or search term, stored in `movies.title_search`.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// All categories ordered by name, served from the cache when possible.
pub async fn categories(cache: &CacheManager) -> AppResult<Arc<Vec<category::Model>>> {
    if let Some(Cached::Categories(list)) = cache.get(&CacheKey::Categories).await {
        return Ok(list);
    }

    let generation = cache.generation();
    let list = Arc::new(
        category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(cache.db())
            .await?,
    );
    debug!(count = list.len(), "loaded categories");

    cache.put(generation, CacheKey::Categories, Cached::Categories(list.clone())).await;
    Ok(list)
}

/// One page of movies matching `filter`, newest first, with the total match count.
///
/// The category list is loaded first because genre slugs resolve against it.
pub async fn fetch_page(
    cache: &CacheManager,
    filter: &CatalogFilter,
) -> AppResult<(Arc<Vec<category::Model>>, Arc<MoviePage>)> {
    let generation = cache.generation();
    let categories = categories(cache).await?;

    let key = CacheKey::MoviePage(filter.clone());
    if let Some(Cached::MoviePage(page)) = cache.get(&key).await {
        return Ok((categories, page));
    }

    let category_id = filter.genre.as_deref().and_then(|slug| resolve_genre(&categories, slug));
    if filter.genre.is_some() && category_id.is_none() {
        debug!(genre = ?filter.genre, "unknown genre, filter dropped");
    }

    let query = compose(filter, category_id);
    let total_count = query.clone().count(cache.db()).await?;
    let movies = if filter.offset() >= total_count {
        Vec::new()
    } else {
        query
            .order_by_desc(movie::Column::CreatedAt)
            .order_by_desc(movie::Column::Id)
            .offset(filter.offset())
            .limit(PAGE_SIZE)
            .all(cache.db())
            .await?
    };

    debug!(page = filter.page, returned = movies.len(), total_count, "fetched movie page");

    let page = Arc::new(MoviePage { movies, total_count });
    cache.put(generation, key, Cached::MoviePage(page.clone())).await;
    Ok((categories, page))
}

/// A single movie with its category, for the detail page.
pub async fn movie_detail(
    cache: &CacheManager,
    id: i32,
) -> AppResult<Option<(movie::Model, Option<category::Model>)>> {
    Ok(movie::Entity::find_by_id(id)
        .find_also_related(category::Entity)
        .one(cache.db())
        .await?)
}

/// Bumps the view counter in place.
pub async fn record_view(cache: &CacheManager, id: i32) -> AppResult<()> {
    movie::Entity::update_many()
        .col_expr(movie::Column::Views, Expr::col(movie::Column::Views).add(1))
        .filter(movie::Column::Id.eq(id))
        .exec(cache.db())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;
    use crate::db::test_db;

    fn query(pairs: &[(&str, &str)]) -> CatalogQuery {
        let mut q = CatalogQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "search" => q.search = v,
                "genre" => q.genre = v,
                "year" => q.year = v,
                "featured" => q.featured = v,
                "page" => q.page = v,
                _ => unreachable!(),
            }
        }
        q
    }

    async fn seed_category(cache: &CacheManager, name: &str) -> category::Model {
        category::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(crate::slug::slugify(name)),
            ..Default::default()
        }
        .insert(cache.db())
        .await
        .unwrap()
    }

    async fn seed_movie(
        cache: &CacheManager,
        title: &str,
        year: i32,
        rating: f64,
        category_id: Option<i32>,
        created_at: i64,
    ) -> movie::Model {
        movie::ActiveModel {
            title: Set(title.to_string()),
            year: Set(Some(year)),
            rating: Set(Some(rating)),
            category_id: Set(category_id),
            views: Set(0),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(cache.db())
        .await
        .unwrap()
    }

    async fn count(cache: &CacheManager, filter: &CatalogFilter) -> u64 {
        let (_, page) = fetch_page(cache, filter).await.unwrap();
        page.total_count
    }

    #[test]
    fn parses_defaults() {
        let filter = CatalogFilter::from_query(&CatalogQuery::default()).unwrap();
        assert_eq!(filter, CatalogFilter::default());
        assert_eq!(filter.page, 1);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn parses_every_field() {
        let filter = CatalogFilter::from_query(&query(&[
            ("search", " matrix "),
            ("genre", "sci-fi"),
            ("year", "1999"),
            ("featured", "true"),
            ("page", "3"),
        ]))
        .unwrap();

        assert_eq!(filter.search.as_deref(), Some("matrix"));
        assert_eq!(filter.genre.as_deref(), Some("sci-fi"));
        assert_eq!(filter.year, Some(1999));
        assert!(filter.featured);
        assert_eq!(filter.offset(), 20);
    }

    #[test]
    fn blank_values_are_absent() {
        let filter = CatalogFilter::from_query(&query(&[
            ("search", "  "),
            ("genre", ""),
            ("year", ""),
            ("page", ""),
            ("featured", "no"),
        ]))
        .unwrap();
        assert_eq!(filter, CatalogFilter::default());
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            CatalogFilter::from_query(&query(&[("year", "nineteen")])),
            Err(FilterError::Year("nineteen".to_string()))
        );
        assert_eq!(
            CatalogFilter::from_query(&query(&[("page", "0")])),
            Err(FilterError::Page("0".to_string()))
        );
        assert!(CatalogFilter::from_query(&query(&[("page", "-2")])).is_err());
    }

    #[test]
    fn href_round_trips_through_query() {
        let filter = CatalogFilter {
            search: Some("the thing".to_string()),
            genre: Some("horror".to_string()),
            year: Some(1982),
            featured: true,
            page: 2,
        };
        assert_eq!(filter.href(), "/?search=the%20thing&genre=horror&year=1982&featured=1&page=2");
        assert_eq!(filter.with_genre(None).href(), "/?search=the%20thing&year=1982&featured=1");
        assert_eq!(CatalogFilter::default().href(), "/");
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
        assert_eq!(page_count(95), 10);
    }

    #[test]
    fn resolves_genre_by_slug() {
        let categories = vec![
            category::Model { id: 4, name: "Action".into(), slug: "action".into() },
            category::Model { id: 9, name: "Sci Fi".into(), slug: "sci-fi".into() },
        ];
        assert_eq!(resolve_genre(&categories, "sci-fi"), Some(9));
        assert_eq!(resolve_genre(&categories, "action"), Some(4));
        assert_eq!(resolve_genre(&categories, "western"), None);
        assert_eq!(resolve_genre(&[], "action"), None);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_newest_first_and_paged() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        for i in 0..12 {
            seed_movie(&cache, &format!("The Matrix Part {i}"), 1999, 7.0, None, 1_000 + i).await;
        }
        seed_movie(&cache, "Inception", 2010, 8.8, None, 5_000).await;

        let filter = CatalogFilter { search: Some("MATRIX".into()), ..Default::default() };
        let (_, page) = fetch_page(&cache, &filter).await.unwrap();

        assert_eq!(page.total_count, 12);
        assert_eq!(page.page_count(), 2);
        assert_eq!(page.movies.len(), 10);
        assert!(page.movies.iter().all(|m| m.title.to_lowercase().contains("matrix")));
        assert_eq!(page.movies[0].title, "The Matrix Part 11");
        assert!(page.movies.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let (_, second) = fetch_page(&cache, &filter.with_page(2)).await.unwrap();
        assert_eq!(second.movies.len(), 2);
        assert_eq!(second.movies[1].title, "The Matrix Part 0");
    }

    #[tokio::test]
    async fn page_out_of_range_is_empty() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_movie(&cache, "Alien", 1979, 8.5, None, 1).await;

        let (_, page) =
            fetch_page(&cache, &CatalogFilter { page: 7, ..Default::default() }).await.unwrap();
        assert!(page.movies.is_empty());
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn enormous_pages_are_empty() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_movie(&cache, "Alien", 1979, 8.5, None, 1).await;

        let max = u64::MAX.to_string();
        for raw in ["1000000000000000000", max.as_str()] {
            let filter = CatalogFilter::from_query(&query(&[("page", raw)])).unwrap();
            let (_, page) = fetch_page(&cache, &filter).await.unwrap();
            assert!(page.movies.is_empty());
            assert_eq!(page.total_count, 1);
        }
        assert_eq!(CatalogFilter { page: u64::MAX, ..Default::default() }.offset(), u64::MAX);
    }

    #[tokio::test]
    async fn distinct_searches_do_not_grow_the_cache() {
        let cache = CacheManager::new(test_db().await, 60, 32);
        seed_movie(&cache, "Heat", 1995, 8.3, None, 1).await;

        for i in 0..500 {
            let filter =
                CatalogFilter { search: Some(format!("needle {i}")), ..Default::default() };
            fetch_page(&cache, &filter).await.unwrap();
        }
        assert!(cache.len().await <= 32);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_movie(&cache, "AMÉLIE", 2001, 8.3, None, 1).await;
        seed_movie(&cache, "Ölmez Ağaç", 2016, 6.0, None, 2).await;

        for term in ["amélie", "Amélie", "ÉLI"] {
            let filter = CatalogFilter { search: Some(term.into()), ..Default::default() };
            let (_, page) = fetch_page(&cache, &filter).await.unwrap();
            assert_eq!(page.total_count, 1, "search {term:?}");
            assert_eq!(page.movies[0].title, "AMÉLIE");
        }

        let filter = CatalogFilter { search: Some("ölmez".into()), ..Default::default() };
        assert_eq!(count(&cache, &filter).await, 1);
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_movie(&cache, "100% Wolf", 2020, 5.0, None, 1).await;
        seed_movie(&cache, "1000 Wolves", 2020, 5.0, None, 2).await;

        let filter = CatalogFilter { search: Some("0%".into()), ..Default::default() };
        let (_, page) = fetch_page(&cache, &filter).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.movies[0].title, "100% Wolf");
    }

    #[tokio::test]
    async fn filters_are_conjunctive() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        let action = seed_category(&cache, "Action").await;
        let drama = seed_category(&cache, "Drama").await;

        seed_movie(&cache, "Heat", 1995, 8.3, Some(action.id), 1).await;
        seed_movie(&cache, "Speed", 1994, 7.2, Some(action.id), 2).await;
        seed_movie(&cache, "Heathers", 1989, 7.1, Some(drama.id), 3).await;
        seed_movie(&cache, "Heat Wave", 1995, 8.1, None, 4).await;

        let everything = CatalogFilter::default();
        let narrowed = [
            CatalogFilter { search: Some("heat".into()), ..Default::default() },
            CatalogFilter { featured: true, ..Default::default() },
            CatalogFilter { genre: Some("action".into()), ..Default::default() },
            CatalogFilter { year: Some(1995), ..Default::default() },
        ];

        let total = count(&cache, &everything).await;
        assert_eq!(total, 4);
        for filter in &narrowed {
            assert!(count(&cache, filter).await <= total);
        }

        let combined = CatalogFilter {
            search: Some("heat".into()),
            featured: true,
            genre: Some("action".into()),
            year: Some(1995),
            page: 1,
        };
        let (_, page) = fetch_page(&cache, &combined).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.movies[0].title, "Heat");

        for filter in &narrowed {
            assert!(page.total_count <= count(&cache, filter).await);
        }
    }

    #[tokio::test]
    async fn unknown_genre_is_ignored() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_category(&cache, "Action").await;
        seed_movie(&cache, "Heat", 1995, 8.3, None, 1).await;
        seed_movie(&cache, "Ronin", 1998, 7.2, None, 2).await;

        let filter = CatalogFilter { genre: Some("western".into()), ..Default::default() };
        assert_eq!(count(&cache, &filter).await, 2);
    }

    #[tokio::test]
    async fn featured_threshold_is_inclusive() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_movie(&cache, "Exactly Eight", 2001, 8.0, None, 1).await;
        seed_movie(&cache, "Almost", 2001, 7.99, None, 2).await;

        let filter = CatalogFilter { featured: true, ..Default::default() };
        let (_, page) = fetch_page(&cache, &filter).await.unwrap();
        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.movies[0].title, "Exactly Eight");
    }

    #[tokio::test]
    async fn categories_are_cached_until_invalidated() {
        let cache = CacheManager::new(test_db().await, 60, 64);
        seed_category(&cache, "Drama").await;
        assert_eq!(categories(&cache).await.unwrap().len(), 1);

        seed_category(&cache, "Action").await;
        assert_eq!(categories(&cache).await.unwrap().len(), 1);

        cache.invalidate(crate::cache::Invalidate::Categories).await;
        let list = categories(&cache).await.unwrap();
        assert_eq!(list.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["Action", "Drama"]);
    }
}
