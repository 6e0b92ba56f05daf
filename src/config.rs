use std::net::SocketAddr;

use anyhow::Context;

/// Minimum length accepted for `SESSION_SECRET`; signed cookies need a 64-byte key.
pub const SESSION_SECRET_MIN_LEN: usize = 64;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_rps: u32,
    pub cache_ttl_secs: i64,
    pub cache_capacity: usize,
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub session_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://marquee.db?mode=rwc".to_string());

        let tmdb_api_key = non_empty_var("TMDB_API_KEY");
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());

        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let cache_ttl_secs: i64 =
            std::env::var("CACHE_TTL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(300);

        let cache_capacity: usize =
            std::env::var("CACHE_CAPACITY").ok().and_then(|s| s.parse().ok()).unwrap_or(1024);

        let admin_username =
            non_empty_var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string());
        let admin_password = non_empty_var("ADMIN_PASSWORD");

        let session_secret = non_empty_var("SESSION_SECRET");
        if let Some(secret) = &session_secret {
            if secret.len() < SESSION_SECRET_MIN_LEN {
                anyhow::bail!("SESSION_SECRET must be at least {SESSION_SECRET_MIN_LEN} bytes");
            }
        }

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_rps,
            cache_ttl_secs,
            cache_capacity,
            admin_username,
            admin_password,
            session_secret,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    })
}
