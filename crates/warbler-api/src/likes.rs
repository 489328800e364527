use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use warbler_db::StoreError;

use crate::error::AppError;
use crate::extract::Id;
use crate::flash::{self, Level};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::views::redirect;

/// Like a message as the current user. Liking your own message is refused.
/// A repeated like is refused by the unique constraint and reported back,
/// never stored twice.
pub async fn add_like(
    State(state): State<AppState>,
    Id(message_id): Id,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let back = format!("/messages/{message_id}");
    let uid = user.id;

    let liked = state
        .db(move |repo| {
            let card = repo.find_message(message_id)?.ok_or(StoreError::NotFound)?;
            if card.author.id == uid {
                return Ok(false);
            }
            repo.add_like(uid, message_id)?;
            Ok::<_, StoreError>(true)
        })
        .await;

    match liked {
        Ok(true) => {
            debug!("User {} liked message {}", uid, message_id);
            Ok(redirect(&back))
        }
        Ok(false) => {
            let jar = flash::push(jar, Level::Danger, "You cannot like your own message.");
            Ok((jar, redirect(&back)).into_response())
        }
        Err(AppError::Store(StoreError::UniqueViolation(_))) => {
            let jar = flash::push(jar, Level::Info, "You already like this message.");
            Ok((jar, redirect(&back)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Remove the current user's like, if there is one.
pub async fn remove_like(
    State(state): State<AppState>,
    Id(message_id): Id,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let uid = user.id;
    let removed = state
        .db(move |repo| repo.remove_like(uid, message_id))
        .await?;

    if removed {
        debug!("User {} unliked message {}", uid, message_id);
    }
    Ok(redirect(&format!("/messages/{message_id}")))
}
