use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_db::{Repository, StoreError};
use warbler_types::api::{ProfileForm, UserSearch, non_blank};
use warbler_types::models::{MessageCard, ProfileChanges, User, UserStats};

use crate::auth::{self, AuthError};
use crate::error::AppError;
use crate::extract::Id;
use crate::flash::{self, Level};
use crate::middleware::{AuthContext, CurrentUser};
use crate::state::AppState;
use crate::views::{self, Layout, ProfileFields, ProfileView, redirect};

/// Messages shown on a profile page.
const PROFILE_MESSAGE_LIMIT: u32 = 100;

/// Target user, their stats, and whether `viewer` follows them.
struct Profile {
    user: User,
    stats: UserStats,
    viewer_follows: bool,
}

impl Profile {
    fn view(&self) -> ProfileView<'_> {
        ProfileView {
            user: &self.user,
            stats: self.stats,
            viewer_follows: self.viewer_follows,
        }
    }
}

fn load_profile(repo: &dyn Repository, user_id: i64, viewer: Option<i64>) -> Result<Profile, AppError> {
    let user = repo.find_user(user_id)?.ok_or(AppError::NotFound)?;
    let stats = repo.user_stats(user_id)?;
    let viewer_follows = match viewer {
        Some(v) if v != user_id => repo.is_following(v, user_id)?,
        _ => false,
    };
    Ok(Profile {
        user,
        stats,
        viewer_follows,
    })
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(search): Query<UserSearch>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let query = non_blank(search.q.as_deref());
    let q = query.clone();
    let viewer = ctx.user.as_ref().map(|u| u.id);
    let (users, following) = state
        .db(move |repo| {
            let users = repo.list_users(q.as_deref())?;
            let following: Vec<i64> = match viewer {
                Some(v) => repo.following(v)?.iter().map(|u| u.id).collect(),
                None => Vec::new(),
            };
            Ok::<_, StoreError>((users, following))
        })
        .await?;

    let (jar, flash) = flash::take(jar);
    let html = views::users_index(
        &Layout::new(ctx.user.as_ref(), flash),
        &users,
        &following,
        query.as_deref(),
    );
    Ok((jar, Html(html)).into_response())
}

/// Profile page with the user's messages, newest first.
pub async fn show_user(
    State(state): State<AppState>,
    Id(user_id): Id,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let viewer = ctx.user.as_ref().map(|u| u.id);
    let (profile, messages, liked) = state
        .db(move |repo| {
            let profile = load_profile(repo, user_id, viewer)?;
            let messages = repo.user_messages(user_id, PROFILE_MESSAGE_LIMIT)?;
            let liked = match viewer {
                Some(v) => repo.liked_message_ids(v)?,
                None => Vec::new(),
            };
            Ok::<_, AppError>((profile, messages, liked))
        })
        .await?;

    let (jar, flash) = flash::take(jar);
    let html = views::user_detail(&Layout::new(ctx.user.as_ref(), flash), &profile.view(), &messages, &liked);
    Ok((jar, Html(html)).into_response())
}

#[derive(Clone, Copy)]
enum Relation {
    Following,
    Followers,
}

async fn relation_page(
    state: AppState,
    user_id: i64,
    viewer: User,
    jar: CookieJar,
    relation: Relation,
) -> Result<Response, AppError> {
    let vid = viewer.id;
    let (profile, users, viewer_following) = state
        .db(move |repo| {
            let profile = load_profile(repo, user_id, Some(vid))?;
            let users = match relation {
                Relation::Following => repo.following(user_id)?,
                Relation::Followers => repo.followers(user_id)?,
            };
            let viewer_following: Vec<i64> = repo.following(vid)?.iter().map(|u| u.id).collect();
            Ok::<_, AppError>((profile, users, viewer_following))
        })
        .await?;

    let (jar, flash) = flash::take(jar);
    let html = views::follow_list(&Layout::new(Some(&viewer), flash), &profile.view(), &users, &viewer_following);
    Ok((jar, Html(html)).into_response())
}

pub async fn show_following(
    State(state): State<AppState>,
    Id(user_id): Id,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    relation_page(state, user_id, viewer, jar, Relation::Following).await
}

pub async fn show_followers(
    State(state): State<AppState>,
    Id(user_id): Id,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    relation_page(state, user_id, viewer, jar, Relation::Followers).await
}

pub async fn show_likes(
    State(state): State<AppState>,
    Id(user_id): Id,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let vid = viewer.id;
    let (profile, cards, liked): (Profile, Vec<MessageCard>, Vec<i64>) = state
        .db(move |repo| {
            let profile = load_profile(repo, user_id, Some(vid))?;
            Ok::<_, AppError>((profile, repo.liked_messages(user_id)?, repo.liked_message_ids(vid)?))
        })
        .await?;

    let (jar, flash) = flash::take(jar);
    let html = views::liked_list(&Layout::new(Some(&viewer), flash), &profile.view(), &cards, &liked);
    Ok((jar, Html(html)).into_response())
}

pub async fn add_follow(
    State(state): State<AppState>,
    Id(follow_id): Id,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let back = format!("/users/{}/following", user.id);

    if follow_id == user.id {
        let jar = flash::push(jar, Level::Danger, "You cannot follow yourself.");
        return Ok((jar, redirect(&back)).into_response());
    }

    let uid = user.id;
    match state.db(move |repo| repo.follow(uid, follow_id)).await {
        Ok(()) => {
            info!("User {} followed {}", uid, follow_id);
            Ok(redirect(&back))
        }
        Err(AppError::Store(StoreError::UniqueViolation(_))) => {
            let jar = flash::push(jar, Level::Info, "You already follow that user.");
            Ok((jar, redirect(&back)).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn stop_following(
    State(state): State<AppState>,
    Id(follow_id): Id,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let uid = user.id;
    if state.db(move |repo| repo.unfollow(uid, follow_id)).await? {
        info!("User {} stopped following {}", uid, follow_id);
    }
    Ok(redirect(&format!("/users/{uid}/following")))
}

pub async fn edit_profile_form(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    let fields = ProfileFields {
        username: &user.username,
        email: &user.email,
        image_url: &user.image_url,
        header_image_url: &user.header_image_url,
        bio: user.bio.as_deref().unwrap_or(""),
        location: user.location.as_deref().unwrap_or(""),
    };
    (jar, Html(views::edit_profile(&Layout::new(Some(&user), flash), None, &fields)))
}

/// Apply profile changes after re-checking the password. A wrong
/// password, bad input or a taken username/email leaves the row untouched
/// and re-renders the form with the reason.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let submitted = form.clone();
    let username = user.username.clone();
    let uid = user.id;

    let outcome = state
        .db(move |repo| {
            if auth::authenticate(repo, &username, &form.password)?.is_none() {
                return Ok(None);
            }

            let changes = ProfileChanges {
                username: form.username.trim().to_string(),
                email: form.email.trim().to_string(),
                image_url: non_blank(form.image_url.as_deref()),
                header_image_url: non_blank(form.header_image_url.as_deref()),
                bio: non_blank(form.bio.as_deref()),
                location: non_blank(form.location.as_deref()),
            };
            auth::validate_identity(&changes.username, &changes.email)?;

            let updated = repo.update_user(uid, &changes).map_err(auth::taken_or_store)?;
            Ok::<_, AuthError>(Some(updated))
        })
        .await;

    let reason = match outcome {
        Ok(Some(updated)) => {
            info!("User {} updated their profile", updated.id);
            let jar = flash::push(jar, Level::Success, "Profile updated.");
            return Ok((jar, redirect(&format!("/users/{}", updated.id))).into_response());
        }
        Ok(None) => {
            warn!("Profile edit for user {} rejected: wrong password", uid);
            "Wrong password, please try again.".to_string()
        }
        Err(AppError::Auth(AuthError::Invalid(reason))) => reason,
        Err(AppError::Auth(AuthError::Taken(field))) => format!("{field} already taken"),
        Err(e) => return Err(e),
    };

    let fields = ProfileFields {
        username: &submitted.username,
        email: &submitted.email,
        image_url: submitted.image_url.as_deref().unwrap_or(""),
        header_image_url: submitted.header_image_url.as_deref().unwrap_or(""),
        bio: submitted.bio.as_deref().unwrap_or(""),
        location: submitted.location.as_deref().unwrap_or(""),
    };
    let html = views::edit_profile(&Layout::new(Some(&user), None), Some(&reason), &fields);
    Ok(Html(html).into_response())
}

/// Delete the account with everything it owns, then log out.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let uid = user.id;
    state.db(move |repo| repo.delete_user(uid)).await?;

    info!("User {} deleted their account", uid);
    Ok((state.session.log_out(jar), redirect("/signup")).into_response())
}
