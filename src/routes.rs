use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState, admin, api, auth,
    catalog::{self, CatalogFilter, CatalogQuery},
    error::{AppError, AppResult},
    import::ImportError,
    models::{CategoryForm, FieldErrors, ImportForm, ImportSearchQuery, LoginForm, MovieForm},
    templates,
};

pub fn router(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.clone(), auth::require_admin);

    let admin_routes = Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/movies", get(admin_movies).post(create_movie))
        .route("/admin/movies/new", get(new_movie))
        .route("/admin/movies/{id}", post(update_movie))
        .route("/admin/movies/{id}/edit", get(edit_movie))
        .route("/admin/movies/{id}/delete", post(delete_movie))
        .route("/admin/categories", get(admin_categories).post(create_category))
        .route("/admin/categories/{id}", post(update_category))
        .route("/admin/categories/{id}/edit", get(edit_category))
        .route("/admin/categories/{id}/delete", post(delete_category))
        .route("/admin/import", get(import_search).post(import_movie))
        .route_layer(gate.clone());

    Router::new()
        .route("/", get(index))
        .route("/movies/{id}", get(movie_details))
        .route("/about-us", get(about))
        .route("/contact-us", get(contact))
        .route("/admin/login", get(login_form).post(login))
        .route("/admin/logout", post(logout))
        .route(
            "/api/tmdb-import",
            post(api::tmdb_import).route_layer(gate).options(api::preflight),
        )
        .merge(admin_routes)
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    notice: Option<String>,
}

fn redirect_with_notice(path: &str, notice: &str) -> Response {
    Redirect::to(&format!("{path}?notice={}", urlencoding::encode(notice))).into_response()
}

fn rejected(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

pub async fn index(
    State(state): State<AppState>,
    Query(q): Query<CatalogQuery>,
) -> AppResult<Html<String>> {
    let filter = CatalogFilter::from_query(&q)?;
    let (categories, page) = catalog::fetch_page(&state.cache, &filter).await?;
    Ok(Html(templates::index_page(&filter, &categories, &page)))
}

pub async fn movie_details(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Html<String>> {
    let Some((movie, category)) = catalog::movie_detail(&state.cache, id).await? else {
        return Err(AppError::not_found("movie"));
    };
    catalog::record_view(&state.cache, id).await?;
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::movie_page(&movie, category.as_ref(), &categories)))
}

pub async fn about(State(state): State<AppState>) -> AppResult<Html<String>> {
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::about_page(&categories)))
}

pub async fn contact(State(state): State<AppState>) -> AppResult<Html<String>> {
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::contact_page(&categories)))
}

pub async fn login_form(jar: SignedCookieJar) -> Response {
    if auth::session_user(&jar).is_some() {
        return Redirect::to("/admin").into_response();
    }
    Html(templates::login_page(None)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if auth::credentials_match(&state.config, &form.username, &form.password) {
        let jar = auth::start_session(jar, form.username.trim());
        return (jar, Redirect::to("/admin")).into_response();
    }
    tracing::warn!(username = %form.username, "failed admin login");
    (StatusCode::UNAUTHORIZED, Html(templates::login_page(Some("Invalid username or password"))))
        .into_response()
}

pub async fn logout(jar: SignedCookieJar) -> Response {
    (auth::end_session(jar), Redirect::to("/admin/login")).into_response()
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Html<String>> {
    let stats = admin::dashboard_stats(&state.cache).await?;
    Ok(Html(templates::dashboard_page(&stats)))
}

pub async fn admin_movies(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    let rows = admin::list_movies(&state.cache).await?;
    Ok(Html(templates::admin_movies_page(&rows, q.notice.as_deref())))
}

pub async fn new_movie(State(state): State<AppState>) -> AppResult<Html<String>> {
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::movie_form_page(
        "/admin/movies",
        &MovieForm::default(),
        &FieldErrors::default(),
        &categories,
        false,
    )))
}

pub async fn create_movie(
    State(state): State<AppState>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    match admin::create_movie(&state.cache, &form).await? {
        Ok(_) => Ok(redirect_with_notice("/admin/movies", "Movie added successfully")),
        Err(errors) => {
            let categories = catalog::categories(&state.cache).await?;
            Ok(rejected(templates::movie_form_page(
                "/admin/movies",
                &form,
                &errors,
                &categories,
                false,
            )))
        },
    }
}

pub async fn edit_movie(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Html<String>> {
    let movie =
        admin::find_movie(&state.cache, id).await?.ok_or_else(|| AppError::not_found("movie"))?;
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::movie_form_page(
        &format!("/admin/movies/{id}"),
        &MovieForm::from_model(&movie),
        &FieldErrors::default(),
        &categories,
        true,
    )))
}

pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    match admin::update_movie(&state.cache, id, &form).await? {
        Ok(Some(_)) => Ok(redirect_with_notice("/admin/movies", "Movie updated successfully")),
        Ok(None) => Err(AppError::not_found("movie")),
        Err(errors) => {
            let categories = catalog::categories(&state.cache).await?;
            Ok(rejected(templates::movie_form_page(
                &format!("/admin/movies/{id}"),
                &form,
                &errors,
                &categories,
                true,
            )))
        },
    }
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    if !admin::delete_movie(&state.cache, id).await? {
        return Err(AppError::not_found("movie"));
    }
    Ok(redirect_with_notice("/admin/movies", "Movie deleted successfully"))
}

pub async fn admin_categories(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    let categories = catalog::categories(&state.cache).await?;
    Ok(Html(templates::admin_categories_page(
        &categories,
        &CategoryForm::default(),
        &FieldErrors::default(),
        None,
        q.notice.as_deref(),
    )))
}

pub async fn create_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    match admin::create_category(&state.cache, &form).await? {
        Ok(_) => Ok(redirect_with_notice("/admin/categories", "Category added successfully")),
        Err(errors) => {
            let categories = catalog::categories(&state.cache).await?;
            Ok(rejected(templates::admin_categories_page(&categories, &form, &errors, None, None)))
        },
    }
}

pub async fn edit_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Html<String>> {
    let category = admin::find_category(&state.cache, id)
        .await?
        .ok_or_else(|| AppError::not_found("category"))?;
    let categories = catalog::categories(&state.cache).await?;
    let form = CategoryForm { name: category.name, slug: category.slug };
    Ok(Html(templates::admin_categories_page(
        &categories,
        &form,
        &FieldErrors::default(),
        Some(id),
        None,
    )))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    match admin::update_category(&state.cache, id, &form).await? {
        Ok(Some(_)) => {
            Ok(redirect_with_notice("/admin/categories", "Category updated successfully"))
        },
        Ok(None) => Err(AppError::not_found("category")),
        Err(errors) => {
            let categories = catalog::categories(&state.cache).await?;
            Ok(rejected(templates::admin_categories_page(
                &categories,
                &form,
                &errors,
                Some(id),
                None,
            )))
        },
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    if !admin::delete_category(&state.cache, id).await? {
        return Err(AppError::not_found("category"));
    }
    Ok(redirect_with_notice("/admin/categories", "Category deleted successfully"))
}

pub async fn import_search(
    State(state): State<AppState>,
    Query(q): Query<ImportSearchQuery>,
    Query(notice): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    let proxy = state.import.as_ref().ok_or(ImportError::NotConfigured)?;
    let query = q.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let results = match query {
        Some(query) => Some(proxy.search(query).await?),
        None => None,
    };
    let categories = catalog::categories(&state.cache).await?;

    Ok(Html(templates::import_page(
        query,
        results.as_ref(),
        &categories,
        notice.notice.as_deref(),
    )))
}

pub async fn import_movie(
    State(state): State<AppState>,
    Form(form): Form<ImportForm>,
) -> AppResult<Response> {
    let proxy = state.import.as_ref().ok_or(ImportError::NotConfigured)?;
    let movie = proxy.import(form.movie_id, form.category_id).await?;
    Ok(redirect_with_notice("/admin/movies", &format!("Imported \"{}\"", movie.title)))
}
