use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use crate::{
    cache::{CacheKey, CacheManager, Cached, Invalidate, now_sec},
    entities::{category, movie},
    error::AppResult,
    models::{CategoryForm, FieldErrors, MovieForm},
    slug::slugify,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub movies: u64,
    pub categories: u64,
    pub views: i64,
}

/// Validated movie fields ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieInput {
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub banner_url: Option<String>,
    pub trailer_url: Option<String>,
    pub download_url: String,
    pub year: i32,
    pub rating: f64,
    pub duration: i32,
    pub category_id: Option<i32>,
}

impl MovieForm {
    pub fn validate(&self) -> Result<MovieInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = errors.required("title", &self.title, "Title is required");
        let description =
            errors.required("description", &self.description, "Description is required");
        let poster_url = errors.required("poster_url", &self.poster_url, "Poster URL is required");
        let download_url =
            errors.required("download_url", &self.download_url, "Download URL is required");

        let year = errors.number::<i32>("year", &self.year, "Valid year is required");
        let duration =
            errors.number::<i32>("duration", &self.duration, "Valid duration is required");
        let rating = errors
            .number::<f64>("rating", &self.rating, "Valid rating is required")
            .filter(|r| {
                let ok = (0.0..=10.0).contains(r);
                if !ok {
                    errors.add("rating", "Rating must be between 0 and 10");
                }
                ok
            });

        let category_id = match optional(&self.category_id) {
            None => None,
            Some(raw) => match raw.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("category_id", "Unknown category");
                    None
                },
            },
        };

        match (title, description, poster_url, download_url, year, rating, duration) {
            (
                Some(title),
                Some(description),
                Some(poster_url),
                Some(download_url),
                Some(year),
                Some(rating),
                Some(duration),
            ) if errors.is_empty() => Ok(MovieInput {
                title,
                description,
                poster_url,
                banner_url: optional(&self.banner_url).map(str::to_string),
                trailer_url: optional(&self.trailer_url).map(str::to_string),
                download_url,
                year,
                rating,
                duration,
                category_id,
            }),
            _ => Err(errors),
        }
    }

    pub fn from_model(movie: &movie::Model) -> Self {
        fn text(v: &Option<impl ToString>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        Self {
            title: movie.title.clone(),
            description: text(&movie.description),
            poster_url: text(&movie.poster_url),
            banner_url: text(&movie.banner_url),
            trailer_url: text(&movie.trailer_url),
            download_url: text(&movie.download_url),
            year: text(&movie.year),
            rating: text(&movie.rating),
            duration: text(&movie.duration),
            category_id: text(&movie.category_id),
        }
    }
}

fn optional(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl MovieInput {
    fn apply(self, model: &mut movie::ActiveModel) {
        model.title = Set(self.title);
        model.description = Set(Some(self.description));
        model.poster_url = Set(Some(self.poster_url));
        model.banner_url = Set(self.banner_url);
        model.trailer_url = Set(self.trailer_url);
        model.download_url = Set(Some(self.download_url));
        model.year = Set(Some(self.year));
        model.rating = Set(Some(self.rating));
        model.duration = Set(Some(self.duration));
        model.category_id = Set(self.category_id);
    }
}

/// Validated category fields. A blank slug falls back to the slugified name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<CategoryInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = errors.required("name", &self.name, "Name is required");

        let slug = match optional(&self.slug) {
            Some(slug) => slugify(slug),
            None => slugify(&self.name),
        };
        if name.is_some() && slug.is_empty() {
            errors.add("slug", "Slug must contain letters or digits");
        }

        match name {
            Some(name) if errors.is_empty() => Ok(CategoryInput { name, slug }),
            _ => Err(errors),
        }
    }
}

/// Outcome of a form submission: either saved or rejected with field errors.
pub type FormResult<T> = AppResult<Result<T, FieldErrors>>;

pub async fn list_movies(
    cache: &CacheManager,
) -> AppResult<Vec<(movie::Model, Option<category::Model>)>> {
    Ok(movie::Entity::find()
        .find_also_related(category::Entity)
        .order_by_desc(movie::Column::CreatedAt)
        .order_by_desc(movie::Column::Id)
        .all(cache.db())
        .await?)
}

pub async fn find_movie(cache: &CacheManager, id: i32) -> AppResult<Option<movie::Model>> {
    Ok(movie::Entity::find_by_id(id).one(cache.db()).await?)
}

pub async fn create_movie(cache: &CacheManager, form: &MovieForm) -> FormResult<movie::Model> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(Err(errors)),
    };
    if !category_exists(cache, input.category_id).await? {
        return Ok(Err(single_error("category_id", "Unknown category")));
    }

    let mut model = movie::ActiveModel {
        views: Set(0),
        created_at: Set(now_sec()),
        ..Default::default()
    };
    input.apply(&mut model);

    let saved = model.insert(cache.db()).await?;
    cache.invalidate(Invalidate::Movies).await;
    info!(id = saved.id, title = %saved.title, "movie created");
    Ok(Ok(saved))
}

/// Returns `Ok(Ok(None))` when no movie has `id`.
pub async fn update_movie(
    cache: &CacheManager,
    id: i32,
    form: &MovieForm,
) -> FormResult<Option<movie::Model>> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(Err(errors)),
    };

    let Some(existing) = find_movie(cache, id).await? else {
        return Ok(Ok(None));
    };
    if !category_exists(cache, input.category_id).await? {
        return Ok(Err(single_error("category_id", "Unknown category")));
    }

    let mut model: movie::ActiveModel = existing.into();
    input.apply(&mut model);
    let saved = model.update(cache.db()).await?;
    cache.invalidate(Invalidate::Movies).await;
    info!(id = saved.id, "movie updated");
    Ok(Ok(Some(saved)))
}

pub async fn delete_movie(cache: &CacheManager, id: i32) -> AppResult<bool> {
    let res = movie::Entity::delete_by_id(id).exec(cache.db()).await?;
    cache.invalidate(Invalidate::Movies).await;
    info!(id, deleted = res.rows_affected, "movie deleted");
    Ok(res.rows_affected > 0)
}

pub async fn find_category(cache: &CacheManager, id: i32) -> AppResult<Option<category::Model>> {
    Ok(category::Entity::find_by_id(id).one(cache.db()).await?)
}

async fn slug_taken(cache: &CacheManager, slug: &str, except: Option<i32>) -> AppResult<bool> {
    let mut query = category::Entity::find().filter(category::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(category::Column::Id.ne(id));
    }
    Ok(query.count(cache.db()).await? > 0)
}

/// A movie may be uncategorized; a given category id must name an existing row.
async fn category_exists(cache: &CacheManager, category_id: Option<i32>) -> AppResult<bool> {
    match category_id {
        Some(id) => Ok(find_category(cache, id).await?.is_some()),
        None => Ok(true),
    }
}

fn single_error(field: &'static str, message: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    errors.add(field, message);
    errors
}

pub async fn create_category(
    cache: &CacheManager,
    form: &CategoryForm,
) -> FormResult<category::Model> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(Err(errors)),
    };
    if slug_taken(cache, &input.slug, None).await? {
        return Ok(Err(single_error("slug", "Slug already in use")));
    }

    let saved = category::ActiveModel {
        name: Set(input.name),
        slug: Set(input.slug),
        ..Default::default()
    }
    .insert(cache.db())
    .await?;

    cache.invalidate(Invalidate::Categories).await;
    info!(id = saved.id, slug = %saved.slug, "category created");
    Ok(Ok(saved))
}

pub async fn update_category(
    cache: &CacheManager,
    id: i32,
    form: &CategoryForm,
) -> FormResult<Option<category::Model>> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(Err(errors)),
    };

    let Some(existing) = find_category(cache, id).await? else {
        return Ok(Ok(None));
    };
    if slug_taken(cache, &input.slug, Some(id)).await? {
        return Ok(Err(single_error("slug", "Slug already in use")));
    }

    let mut model: category::ActiveModel = existing.into();
    model.name = Set(input.name);
    model.slug = Set(input.slug);
    let saved = model.update(cache.db()).await?;

    cache.invalidate(Invalidate::Categories).await;
    info!(id, slug = %saved.slug, "category updated");
    Ok(Ok(Some(saved)))
}

/// Deletes the category and detaches its movies in one transaction.
pub async fn delete_category(cache: &CacheManager, id: i32) -> AppResult<bool> {
    let txn = cache.db().begin().await?;

    let detached = movie::Entity::update_many()
        .col_expr(movie::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(movie::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?;
    let res = category::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    cache.invalidate(Invalidate::Categories).await;
    info!(id, detached = detached.rows_affected, "category deleted");
    Ok(res.rows_affected > 0)
}

pub async fn dashboard_stats(cache: &CacheManager) -> AppResult<DashboardStats> {
    if let Some(Cached::DashboardStats(stats)) = cache.get(&CacheKey::DashboardStats).await {
        return Ok(stats);
    }

    let generation = cache.generation();
    let db = cache.db();
    let (movies, categories, views) = futures::try_join!(
        movie::Entity::find().count(db),
        category::Entity::find().count(db),
        movie::Entity::find()
            .select_only()
            .column_as(Expr::col(movie::Column::Views).sum(), "views")
            .into_tuple::<Option<i64>>()
            .one(db),
    )?;

    let stats = DashboardStats { movies, categories, views: views.flatten().unwrap_or(0) };
    cache.put(generation, CacheKey::DashboardStats, Cached::DashboardStats(stats)).await;
    Ok(stats)
}
