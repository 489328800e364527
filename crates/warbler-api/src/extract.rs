use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;

use crate::error::AppError;

/// Numeric id from the last path parameter. Anything that does not parse
/// names no row, so it renders the 404 page instead of a 400.
pub struct Id(pub i64);

impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                debug!("Unparseable id in {}: {}", parts.uri.path(), e);
                AppError::NotFound
            })?;
        Ok(Id(id))
    }
}
