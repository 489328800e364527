use std::sync::Arc;

use tracing::error;
use warbler_db::Repository;

use crate::error::AppError;
use crate::session::SessionKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub repo: Arc<dyn Repository>,
    pub session: SessionKeys,
}

impl AppStateInner {
    pub fn new(repo: Arc<dyn Repository>, session: SessionKeys) -> AppState {
        Arc::new(Self { repo, session })
    }

    /// Run blocking repository work (SQLite, password hashing) off the
    /// async runtime.
    pub async fn db<F, T, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn Repository) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<AppError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(repo.as_ref()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                AppError::Internal(e.to_string())
            })?
            .map_err(Into::into)
    }
}
