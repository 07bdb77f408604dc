use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_PUBLIC_PREFIXES: &[&str] = &[
    "/api/auth/signup",
    "/api/auth/login",
    "/api/auth/check",
    "/api/auth/logout",
    "/api/health",
];

/// Runtime configuration, read from `HEARTH_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub secret_key: String,
    pub session_cookie: String,
    pub session_ttl_hours: i64,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub upload_dir: PathBuf,
    pub seed_path: PathBuf,
    /// Path prefixes that bypass the session gate.
    pub public_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("hearth.db"),
            secret_key: "dev-secret-change-me".into(),
            session_cookie: "session_id".into(),
            session_ttl_hours: 24,
            cors_origins: vec!["*".into()],
            host: "0.0.0.0".into(),
            port: 8000,
            debug: false,
            upload_dir: PathBuf::from("./uploads"),
            seed_path: PathBuf::from("data/seed.json"),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let session_ttl_hours = match env("HEARTH_SESSION_TTL_HOURS") {
            Some(v) => parse_ttl_hours(&v)?,
            None => defaults.session_ttl_hours,
        };
        let port = match env("HEARTH_PORT") {
            Some(v) => v.parse().context("HEARTH_PORT must be a port number")?,
            None => defaults.port,
        };
        let debug = env("HEARTH_DEBUG")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.debug);

        Ok(Self {
            db_path: env("HEARTH_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            secret_key: env("HEARTH_SECRET_KEY").unwrap_or(defaults.secret_key),
            session_cookie: env("HEARTH_SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            session_ttl_hours,
            cors_origins: env("HEARTH_CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.cors_origins),
            host: env("HEARTH_HOST").unwrap_or(defaults.host),
            port,
            debug,
            upload_dir: env("HEARTH_UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            seed_path: env("HEARTH_SEED_PATH").map(PathBuf::from).unwrap_or(defaults.seed_path),
            public_prefixes: env("HEARTH_PUBLIC_PREFIXES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.public_prefixes),
        })
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.secret_key == "dev-secret-change-me"
    }
}

/// Longest session lifetime accepted from the environment: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

fn parse_ttl_hours(v: &str) -> Result<i64> {
    let hours: i64 = v
        .trim()
        .parse()
        .context("HEARTH_SESSION_TTL_HOURS must be an integer")?;
    anyhow::ensure!(
        (1..=MAX_SESSION_TTL_HOURS).contains(&hours),
        "HEARTH_SESSION_TTL_HOURS must be between 1 and {}, got {}",
        MAX_SESSION_TTL_HOURS,
        hours
    );
    Ok(hours)
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
