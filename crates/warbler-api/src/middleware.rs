use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use warbler_types::models::User;

use crate::flash::{self, Level};
use crate::session::SESSION_COOKIE;
use crate::state::AppState;
use crate::views::redirect;

/// Who is making the request. Inserted for every request by
/// [`load_session`]; `user` is `None` for anonymous visitors.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<User>,
}

/// The logged-in user, present only behind [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve the session cookie into an [`AuthContext`].
/// Bad tokens and tokens naming a deleted user both count as anonymous.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user_id = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.session.verify(cookie.value()));

    let user = match user_id {
        Some(id) => match state.db(move |repo| repo.find_user(id)).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Could not load session user {}: {}", id, e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(AuthContext { user });
    next.run(req).await
}

/// Gate for routes that need a logged-in user: anonymous requests are
/// redirected home with a flash instead of reaching the handler.
pub async fn require_login(jar: CookieJar, mut req: Request, next: Next) -> Response {
    let user = req
        .extensions()
        .get::<AuthContext>()
        .and_then(|ctx| ctx.user.clone());

    match user {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => (
            flash::push(jar, Level::Danger, "Access unauthorized."),
            redirect("/"),
        )
            .into_response(),
    }
}
