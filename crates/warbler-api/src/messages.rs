use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_types::api::MessageForm;
use warbler_types::models::MAX_MESSAGE_LEN;

use crate::error::AppError;
use crate::extract::Id;
use crate::flash::{self, Level};
use crate::middleware::{AuthContext, CurrentUser};
use crate::state::AppState;
use crate::views::{self, Layout, redirect};

pub async fn new_message_form(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    let html = views::new_message_form(&Layout::new(Some(&user), flash), None, "");
    (jar, Html(html))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let text = form.text.trim().to_string();
    let len = text.chars().count();
    if len == 0 || len > MAX_MESSAGE_LEN {
        let reason = format!("Messages must be between 1 and {MAX_MESSAGE_LEN} characters.");
        let html = views::new_message_form(&Layout::new(Some(&user), None), Some(&reason), &form.text);
        return Ok(Html(html).into_response());
    }

    let uid = user.id;
    let message = state
        .db(move |repo| repo.create_message(uid, &text))
        .await?;

    info!("User {} posted message {}", uid, message.id);
    Ok(redirect(&format!("/users/{uid}")))
}

pub async fn show_message(
    State(state): State<AppState>,
    Id(message_id): Id,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let viewer = ctx.user.as_ref().map(|u| u.id);
    let (card, liked) = state
        .db(move |repo| {
            let card = repo.find_message(message_id)?;
            let liked = match viewer {
                Some(uid) => repo.liked_message_ids(uid)?.contains(&message_id),
                None => false,
            };
            Ok::<_, AppError>((card, liked))
        })
        .await?;
    let card = card.ok_or(AppError::NotFound)?;

    let (jar, flash) = flash::take(jar);
    let html = views::message_detail(&Layout::new(ctx.user.as_ref(), flash), &card, liked);
    Ok((jar, Html(html)).into_response())
}

/// Only the author may delete a message.
pub async fn delete_message(
    State(state): State<AppState>,
    Id(message_id): Id,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let card = state
        .db(move |repo| repo.find_message(message_id))
        .await?
        .ok_or(AppError::NotFound)?;

    if card.author.id != user.id {
        warn!(
            "User {} tried to delete message {} owned by {}",
            user.id, message_id, card.author.id
        );
        let jar = flash::push(jar, Level::Danger, "Access unauthorized.");
        return Ok((jar, redirect("/")).into_response());
    }

    state.db(move |repo| repo.delete_message(message_id)).await?;

    info!("User {} deleted message {}", user.id, message_id);
    Ok(redirect(&format!("/users/{}", user.id)))
}
