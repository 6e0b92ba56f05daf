mod admin;
mod api;
mod auth;
mod cache;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod import;
mod models;
mod routes;
mod slug;
mod templates;
mod tmdb;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::{cache::CacheManager, config::Config, import::ImportProxy, tmdb::TmdbClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: CacheManager,
    /// `None` when no TMDB key is configured; the import endpoints then refuse every request.
    pub import: Option<ImportProxy>,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,marquee=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("marquee/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = CacheManager::new(db, config.cache_ttl_secs, config.cache_capacity);

    let import = match &config.tmdb_api_key {
        Some(key) => {
            let tmdb = TmdbClient::new(
                http,
                key.clone(),
                config.tmdb_base_url.clone(),
                config.tmdb_rps,
            );
            Some(ImportProxy::new(Arc::new(tmdb), cache.clone()))
        },
        None => {
            tracing::warn!("TMDB_API_KEY not set, import proxy disabled");
            None
        },
    };

    if config.admin_password.is_none() {
        tracing::warn!("ADMIN_PASSWORD not set, admin area is locked");
    }

    let cookie_key = match &config.session_secret {
        Some(secret) => Key::try_from(secret.as_bytes()).context("SESSION_SECRET")?,
        None => {
            tracing::warn!("SESSION_SECRET not set, admin sessions end on restart");
            Key::generate()
        },
    };

    let state = AppState { config: config.clone(), cache, import, cookie_key };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
