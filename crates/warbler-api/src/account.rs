use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info};

use warbler_types::api::{LoginForm, SignupForm};

use crate::auth::{self, AuthError};
use crate::error::AppError;
use crate::flash::{self, Level};
use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::views::{self, Layout, redirect};

/// Home feed holds this many of the newest messages.
const FEED_LIMIT: u32 = 100;

pub async fn home(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);
    let Some(user) = ctx.user else {
        return Ok((jar, Html(views::anon_home(&Layout::new(None, flash)))).into_response());
    };

    let uid = user.id;
    let (stats, feed, liked) = state
        .db(move |repo| {
            Ok::<_, AppError>((
                repo.user_stats(uid)?,
                repo.home_feed(uid, FEED_LIMIT)?,
                repo.liked_message_ids(uid)?,
            ))
        })
        .await?;

    let html = views::home(&Layout::new(Some(&user), flash), &user, &stats, &feed, &liked);
    Ok((jar, Html(html)).into_response())
}

pub async fn signup_form(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    let html = views::signup_form(&Layout::new(None, flash), None, "", "", "");
    (jar, Html(html))
}

/// Create the account and log it in. Bad input or a taken username/email
/// re-renders the form with the reason.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let submitted = form.clone();
    match state.db(move |repo| auth::signup(repo, &form)).await {
        Ok(user) => {
            let jar = state.session.log_in(jar, user.id).map_err(|e| {
                error!("Could not issue session token: {}", e);
                AppError::Internal(e.to_string())
            })?;
            Ok((jar, redirect("/")).into_response())
        }
        Err(AppError::Auth(AuthError::Invalid(reason))) => Ok(render_signup(&submitted, &reason)),
        Err(AppError::Auth(AuthError::Taken(field))) => {
            Ok(render_signup(&submitted, &format!("{field} already taken")))
        }
        Err(e) => Err(e),
    }
}

fn render_signup(form: &SignupForm, reason: &str) -> Response {
    Html(views::signup_form(
        &Layout::new(None, None),
        Some(reason),
        &form.username,
        &form.email,
        form.image_url.as_deref().unwrap_or(""),
    ))
    .into_response()
}

pub async fn login_form(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    let html = views::login_form(&Layout::new(None, flash), None, "");
    (jar, Html(html))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.clone();
    let user = state
        .db(move |repo| auth::authenticate(repo, &form.username, &form.password))
        .await?;

    let Some(user) = user else {
        let html = views::login_form(&Layout::new(None, None), Some("Invalid credentials."), &username);
        return Ok(Html(html).into_response());
    };

    info!("User {} logged in", user.id);
    let jar = state
        .session
        .log_in(jar, user.id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let jar = flash::push(jar, Level::Success, &format!("Hello, {}!", user.username));
    Ok((jar, redirect("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = flash::push(state.session.log_out(jar), Level::Success, "You have been logged out.");
    (jar, redirect("/login"))
}
