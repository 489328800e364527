//! Server-rendered pages. Every piece of user-supplied text goes through
//! `esc` (element content) or `attr` (attribute values).

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use htmlescape::{encode_attribute as attr, encode_minimal as esc};
use warbler_types::models::{MAX_MESSAGE_LEN, MessageCard, User, UserStats};

use crate::flash::Flash;

/// `302 Found` to `to`.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

/// Per-request page chrome: who is logged in and any pending flash.
pub struct Layout<'a> {
    pub user: Option<&'a User>,
    pub flash: Option<Flash>,
}

impl<'a> Layout<'a> {
    pub fn new(user: Option<&'a User>, flash: Option<Flash>) -> Self {
        Self { user, flash }
    }
}

pub fn page(layout: &Layout<'_>, title: &str, body: &str) -> String {
    let nav = match layout.user {
        Some(user) => format!(
            r#"<li><a href="/users/{id}">@{name}</a></li>
      <li><a href="/messages/new">New Message</a></li>
      <li><a href="/logout">Log out</a></li>"#,
            id = user.id,
            name = esc(&user.username),
        ),
        None => r#"<li><a href="/signup">Sign up</a></li>
      <li><a href="/login">Log in</a></li>"#
            .to_string(),
    };

    let flash = layout
        .flash
        .as_ref()
        .map(|f| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                f.level.as_str(),
                esc(&f.text)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <link rel="stylesheet" href="/static/stylesheets/style.css">
</head>
<body>
  <nav class="navbar">
    <a href="/" class="navbar-brand">Warbler</a>
    <form class="navbar-form" action="/users">
      <input name="q" placeholder="Search Warbler">
    </form>
    <ul class="nav">
      {nav}
    </ul>
  </nav>
  <div class="container">
    {flash}
    {body}
  </div>
</body>
</html>
"#,
        title = esc(title),
    )
}

pub fn not_found() -> String {
    page(
        &Layout::new(None, None),
        "Not Found",
        r#"<h1>404</h1><p>Sorry, we couldn't find that page. <a href="/">Go home</a>.</p>"#,
    )
}

pub fn server_error() -> String {
    page(
        &Layout::new(None, None),
        "Error",
        "<h1>500</h1><p>Something went wrong. Please try again.</p>",
    )
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="alert alert-danger">{}</div>"#, esc(e)))
        .unwrap_or_default()
}

fn text_input(name: &str, kind: &str, placeholder: &str, value: &str) -> String {
    format!(
        r#"<input type="{kind}" name="{name}" placeholder="{placeholder}" value="{value}" class="form-control">"#,
        value = attr(value),
    )
}

// -- Account --

pub fn anon_home(layout: &Layout<'_>) -> String {
    page(
        layout,
        "Warbler",
        r#"<div class="home-hero">
  <h1>What's Happening?</h1>
  <h4>New to Warbler?</h4>
  <a href="/signup" class="btn btn-primary">Sign up now</a>
</div>"#,
    )
}

pub fn home(layout: &Layout<'_>, user: &User, stats: &UserStats, feed: &[MessageCard], liked: &[i64]) -> String {
    let body = format!(
        r#"<aside class="user-card">
  <a href="/users/{id}"><img src="{image}" alt="Image for {name}"></a>
  <p>@{name}</p>
  <ul class="user-stats">
    <li><a href="/users/{id}">Messages {messages}</a></li>
    <li><a href="/users/{id}/following">Following {following}</a></li>
    <li><a href="/users/{id}/followers">Followers {followers}</a></li>
  </ul>
</aside>
<section class="timeline">
{list}
</section>"#,
        id = user.id,
        image = attr(&user.image_url),
        name = esc(&user.username),
        messages = stats.messages,
        following = stats.following,
        followers = stats.followers,
        list = message_list(feed, Some(user.id), liked),
    );
    page(layout, "Warbler", &body)
}

pub fn signup_form(layout: &Layout<'_>, error: Option<&str>, username: &str, email: &str, image_url: &str) -> String {
    let body = format!(
        r#"<h2>Join Warbler today.</h2>
{error}
<form method="POST" action="/signup" id="user_form">
  {username}
  {email}
  {password}
  {image}
  <button class="btn btn-primary">Sign me up!</button>
</form>"#,
        error = error_block(error),
        username = text_input("username", "text", "Username", username),
        email = text_input("email", "email", "E-mail", email),
        password = text_input("password", "password", "Password", ""),
        image = text_input("image_url", "text", "(Optional) Image URL", image_url),
    );
    page(layout, "Sign up", &body)
}

pub fn login_form(layout: &Layout<'_>, error: Option<&str>, username: &str) -> String {
    let body = format!(
        r#"<h2>Welcome back.</h2>
{error}
<form method="POST" action="/login" id="user_form">
  {username}
  {password}
  <button class="btn btn-primary">Log in</button>
</form>"#,
        error = error_block(error),
        username = text_input("username", "text", "Username", username),
        password = text_input("password", "password", "Password", ""),
    );
    page(layout, "Log in", &body)
}

// -- Messages --

/// Messages as a list. Like buttons appear when `viewer` is set and the
/// viewer is not the author.
pub fn message_list(cards: &[MessageCard], viewer: Option<i64>, liked: &[i64]) -> String {
    if cards.is_empty() {
        return r#"<p class="empty">No messages yet.</p>"#.to_string();
    }

    let mut out = String::from(r#"<ul class="list-group" id="messages">"#);
    for card in cards {
        let m = &card.message;
        let like_button = match viewer {
            Some(viewer) if viewer != card.author.id => like_form(m.id, liked.contains(&m.id)),
            _ => String::new(),
        };
        out.push_str(&format!(
            r#"
  <li class="list-group-item">
    <a href="/users/{uid}"><img src="{image}" alt="" class="timeline-image"></a>
    <div class="message-area">
      <a href="/users/{uid}">@{name}</a>
      <span class="text-muted">{date}</span>
      <p><a href="/messages/{mid}">{text}</a></p>
      <span class="likes">{likes} likes</span>
      {like_button}
    </div>
  </li>"#,
            uid = card.author.id,
            image = attr(&card.author.image_url),
            name = esc(&card.author.username),
            date = m.timestamp.format("%d %B %Y"),
            mid = m.id,
            text = esc(&m.text),
            likes = card.like_count,
        ));
    }
    out.push_str("\n</ul>");
    out
}

fn like_form(message_id: i64, liked: bool) -> String {
    if liked {
        format!(
            r#"<form method="POST" action="/messages/{message_id}/like/delete" class="messages-like"><button class="btn btn-primary">Unlike</button></form>"#
        )
    } else {
        format!(
            r#"<form method="POST" action="/messages/{message_id}/like" class="messages-like"><button class="btn btn-secondary">Like</button></form>"#
        )
    }
}

pub fn new_message_form(layout: &Layout<'_>, error: Option<&str>, text: &str) -> String {
    let body = format!(
        r#"{error}
<form method="POST" action="/messages/new">
  <textarea name="text" maxlength="{MAX_MESSAGE_LEN}" placeholder="What's happening?" class="form-control">{text}</textarea>
  <button class="btn btn-outline-success btn-block">Add my message!</button>
</form>"#,
        error = error_block(error),
        text = esc(text),
    );
    page(layout, "New Message", &body)
}

pub fn message_detail(layout: &Layout<'_>, card: &MessageCard, liked: bool) -> String {
    let m = &card.message;
    let controls = match layout.user {
        Some(viewer) if viewer.id == card.author.id => format!(
            r#"<form method="POST" action="/messages/{}/delete"><button class="btn btn-outline-danger">Delete</button></form>"#,
            m.id
        ),
        Some(_) => like_form(m.id, liked),
        None => String::new(),
    };

    let body = format!(
        r#"<div class="message-detail">
  <a href="/users/{uid}"><img src="{image}" alt="" class="timeline-image"></a>
  <a href="/users/{uid}">@{name}</a>
  <span class="text-muted">{date}</span>
  <p class="single-message">{text}</p>
  <span class="likes">{likes} likes</span>
  {controls}
</div>"#,
        uid = card.author.id,
        image = attr(&card.author.image_url),
        name = esc(&card.author.username),
        date = m.timestamp.format("%d %B %Y"),
        text = esc(&m.text),
        likes = card.like_count,
    );
    page(layout, "Message", &body)
}

// -- Users --

/// `following` holds the ids the viewer follows.
pub fn users_index(layout: &Layout<'_>, users: &[User], following: &[i64], query: Option<&str>) -> String {
    if users.is_empty() {
        let body = match query {
            Some(q) => format!("<h3>Sorry, no users found matching \"{}\"</h3>", esc(q)),
            None => "<h3>Sorry, no users found</h3>".to_string(),
        };
        return page(layout, "Users", &body);
    }
    let body = format!(r#"<div class="row">{}</div>"#, user_cards(users, following, layout.user));
    page(layout, "Users", &body)
}

/// Grid of user cards. `following` holds the ids the viewer follows and
/// decides which follow button each card gets.
fn user_cards(users: &[User], following: &[i64], viewer: Option<&User>) -> String {
    let mut out = String::new();
    for user in users {
        let button = match viewer {
            Some(v) if v.id != user.id => follow_form(user.id, following.contains(&user.id)),
            _ => String::new(),
        };
        out.push_str(&format!(
            r#"
<div class="card user-card">
  <a href="/users/{id}"><img src="{image}" alt="Image for {name}"></a>
  <p>@{name}</p>
  {button}
  <p class="card-bio">{bio}</p>
</div>"#,
            id = user.id,
            image = attr(&user.image_url),
            name = esc(&user.username),
            bio = esc(user.bio.as_deref().unwrap_or("")),
        ));
    }
    out
}

fn follow_form(user_id: i64, following: bool) -> String {
    if following {
        format!(
            r#"<form method="POST" action="/users/stop-following/{user_id}"><button class="btn btn-primary btn-sm">Unfollow</button></form>"#
        )
    } else {
        format!(
            r#"<form method="POST" action="/users/follow/{user_id}"><button class="btn btn-outline-primary btn-sm">Follow</button></form>"#
        )
    }
}

/// Profile header shared by every `/users/<id>` page.
fn profile_header(layout: &Layout<'_>, user: &User, stats: &UserStats, viewer_follows: bool) -> String {
    let action = match layout.user {
        Some(v) if v.id == user.id => {
            r#"<a href="/users/profile" class="btn btn-outline-secondary">Edit Profile</a>
      <form method="POST" action="/users/delete" class="form-inline"><button class="btn btn-outline-danger">Delete Profile</button></form>"#
                .to_string()
        }
        Some(_) => follow_form(user.id, viewer_follows),
        None => String::new(),
    };

    format!(
        r#"<div class="profile-header">
  <img src="{header}" alt="" class="header-image">
  <img src="{image}" alt="Image for {name}" class="profile-avatar">
  <h4 class="profile-username">@{name}</h4>
  <p class="profile-bio">{bio}</p>
  <p class="profile-location">{location}</p>
  <ul class="user-stats">
    <li><a href="/users/{id}">Messages {messages}</a></li>
    <li><a href="/users/{id}/following">Following {following}</a></li>
    <li><a href="/users/{id}/followers">Followers {followers}</a></li>
    <li><a href="/users/{id}/likes">Likes {likes}</a></li>
  </ul>
  <div class="profile-actions">
      {action}
  </div>
</div>"#,
        id = user.id,
        header = attr(&user.header_image_url),
        image = attr(&user.image_url),
        name = esc(&user.username),
        bio = esc(user.bio.as_deref().unwrap_or("")),
        location = esc(user.location.as_deref().unwrap_or("")),
        messages = stats.messages,
        following = stats.following,
        followers = stats.followers,
        likes = stats.likes,
    )
}

pub struct ProfileView<'a> {
    pub user: &'a User,
    pub stats: UserStats,
    pub viewer_follows: bool,
}

pub fn user_detail(layout: &Layout<'_>, profile: &ProfileView<'_>, messages: &[MessageCard], liked: &[i64]) -> String {
    let body = format!(
        "{}\n{}",
        profile_header(layout, profile.user, &profile.stats, profile.viewer_follows),
        message_list(messages, layout.user.map(|u| u.id), liked),
    );
    page(layout, &profile.user.username, &body)
}

pub fn follow_list(
    layout: &Layout<'_>,
    profile: &ProfileView<'_>,
    users: &[User],
    viewer_following: &[i64],
) -> String {
    let list = if users.is_empty() {
        r#"<p class="empty">Nobody here yet.</p>"#.to_string()
    } else {
        user_cards(users, viewer_following, layout.user)
    };
    let body = format!(
        "{}\n<div class=\"row\">{}</div>",
        profile_header(layout, profile.user, &profile.stats, profile.viewer_follows),
        list,
    );
    page(layout, &profile.user.username, &body)
}

pub fn liked_list(layout: &Layout<'_>, profile: &ProfileView<'_>, cards: &[MessageCard], liked: &[i64]) -> String {
    let body = format!(
        "{}\n{}",
        profile_header(layout, profile.user, &profile.stats, profile.viewer_follows),
        message_list(cards, layout.user.map(|u| u.id), liked),
    );
    page(layout, &profile.user.username, &body)
}

/// Values shown in the edit form; on a failed submit these are the
/// submitted values rather than the stored ones.
pub struct ProfileFields<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub image_url: &'a str,
    pub header_image_url: &'a str,
    pub bio: &'a str,
    pub location: &'a str,
}

pub fn edit_profile(layout: &Layout<'_>, error: Option<&str>, fields: &ProfileFields<'_>) -> String {
    let body = format!(
        r#"<h2 class="join-message">Edit Your Profile.</h2>
{error}
<form method="POST" action="/users/profile" id="user_form">
  {username}
  {email}
  {image}
  {header}
  <textarea name="bio" placeholder="Tell us about yourself" class="form-control">{bio}</textarea>
  {location}
  <p>To confirm changes, enter your password:</p>
  {password}
  <button class="btn btn-success">Edit this user!</button>
  <a href="/users/{cancel}" class="btn btn-outline-secondary">Cancel</a>
</form>"#,
        error = error_block(error),
        username = text_input("username", "text", "Username", fields.username),
        email = text_input("email", "email", "E-mail", fields.email),
        image = text_input("image_url", "text", "(Optional) Image URL", fields.image_url),
        header = text_input("header_image_url", "text", "(Optional) Header Image URL", fields.header_image_url),
        bio = esc(fields.bio),
        location = text_input("location", "text", "(Optional) Location", fields.location),
        password = text_input("password", "password", "Password", ""),
        cancel = layout.user.map(|u| u.id).unwrap_or_default(),
    );
    page(layout, "Edit Profile", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: 1,
            username: name.into(),
            email: "a@b.com".into(),
            password: "hash".into(),
            image_url: "/img.png".into(),
            header_image_url: "/hdr.png".into(),
            bio: None,
            location: None,
        }
    }

    #[test]
    fn test_user_text_is_escaped() {
        let u = user("<script>");
        let html = page(&Layout::new(Some(&u), None), "t", "");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_user_cards_render_each_user() {
        let mut viewer = user("viewer");
        viewer.id = 1;
        let mut followed = user("<b>followed</b>");
        followed.id = 2;
        let mut other = user("other");
        other.id = 3;

        let html = user_cards(&[viewer.clone(), followed, other], &[2], Some(&viewer));
        assert_eq!(html.matches("user-card").count(), 3);
        assert!(html.contains("@&lt;b&gt;followed&lt;/b&gt;"));
        assert!(html.contains(r#"action="/users/stop-following/2""#));
        assert!(html.contains(r#"action="/users/follow/3""#));
        assert!(!html.contains("/users/follow/1"));
    }

    #[test]
    fn test_redirect_is_found() {
        let resp = redirect("/login");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
    }
}
