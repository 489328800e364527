use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cookie holding the signed id of the logged-in user.
pub const SESSION_COOKIE: &str = "curr_user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

/// Signs and checks session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: chrono::Duration,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
            secure: false,
        }
    }

    /// Mark session cookies `Secure` (HTTPS deployments).
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn issue(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id,
            exp: (chrono::Utc::now() + self.lifetime).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// User id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<i64> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| debug!("Rejected session token: {}", e))
            .ok()
    }

    /// Add the session cookie for `user_id` to the jar. The cookie outlives
    /// the browser session for as long as the token is valid.
    pub fn log_in(&self, jar: CookieJar, user_id: i64) -> Result<CookieJar, jsonwebtoken::errors::Error> {
        let token = self.issue(user_id)?;
        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.lifetime.num_seconds().max(0)));
        Ok(jar.add(cookie))
    }

    pub fn log_out(&self, jar: CookieJar) -> CookieJar {
        jar.remove(
            Cookie::build(SESSION_COOKIE)
                .path("/")
                .http_only(true)
                .secure(self.secure)
                .same_site(SameSite::Lax),
        )
    }
}
