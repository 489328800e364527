//! One-shot feedback carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Danger,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Danger => "danger",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "success" => Level::Success,
            "danger" => Level::Danger,
            _ => Level::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub text: String,
}

pub fn push(jar: CookieJar, level: Level, text: &str) -> CookieJar {
    let value = urlencoding::encode(&format!("{}|{}", level.as_str(), text)).into_owned();
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Read the pending flash, if any, and clear it from the jar.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(raw) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };

    let flash = urlencoding::decode(&raw).ok().and_then(|decoded| {
        decoded.split_once('|').map(|(level, text)| Flash {
            level: Level::parse(level),
            text: text.to_string(),
        })
    });

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
