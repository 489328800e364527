use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::{get, post},
};

use crate::middleware::{load_session, require_login};
use crate::state::AppState;
use crate::{account, likes, messages, users, views};

/// The whole application. Every request passes through `load_session`;
/// the protected group additionally through `require_login`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(account::home))
        .route("/signup", get(account::signup_form).post(account::signup))
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", get(account::logout))
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::show_user))
        .route("/messages/{message_id}", get(messages::show_message));

    let protected_routes = Router::new()
        .route(
            "/messages/new",
            get(messages::new_message_form).post(messages::create_message),
        )
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route("/messages/{message_id}/like", post(likes::add_like))
        .route("/messages/{message_id}/like/delete", post(likes::remove_like))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/users/follow/{follow_id}", post(users::add_follow))
        .route("/users/stop-following/{follow_id}", post(users::stop_following))
        .route(
            "/users/profile",
            get(users::edit_profile_form).post(users::update_profile),
        )
        .route("/users/delete", post(users::delete_user))
        .route_layer(middleware::from_fn(require_login));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found()))
}
