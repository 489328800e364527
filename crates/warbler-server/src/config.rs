use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Secrets that are fine for local development and nothing else.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me"];

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub secret_key: String,
    pub session_days: i64,
    pub static_dir: PathBuf,
    pub is_production: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("WARBLER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()?;
        let db_path: PathBuf = env::var("WARBLER_DB_PATH")
            .unwrap_or_else(|_| "warbler.db".into())
            .into();
        let secret_key =
            env::var("WARBLER_SECRET_KEY").unwrap_or_else(|_| "dev-secret-change-me".into());
        let session_days = env::var("WARBLER_SESSION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);
        let static_dir: PathBuf = env::var("WARBLER_STATIC_DIR")
            .unwrap_or_else(|_| "./static".into())
            .into();
        let is_production = matches!(
            env::var("WARBLER_ENV").ok().as_deref(),
            Some("production") | Some("prod")
        );

        if PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            if is_production {
                anyhow::bail!("WARBLER_SECRET_KEY is unset or still a placeholder");
            }
            warn!("WARBLER_SECRET_KEY is a placeholder; sessions are forgeable");
        }

        Ok(Self {
            host,
            port,
            db_path,
            secret_key,
            session_days,
            static_dir,
            is_production,
        })
    }
}
