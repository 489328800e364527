use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::{info, warn};

use warbler_db::{Repository, StoreError};
use warbler_types::api::{SignupForm, non_blank};
use warbler_types::models::{NewUser, User};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Form input rejected before touching the database.
    #[error("{0}")]
    Invalid(String),

    /// Username or email already belongs to someone else.
    #[error("{0} already taken")]
    Taken(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate the form, hash the password with Argon2id and insert the user.
pub fn signup(repo: &dyn Repository, form: &SignupForm) -> Result<User, AuthError> {
    let username = form.username.trim();
    let email = form.email.trim();

    validate_identity(username, email)?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    let password_hash = hash_password(&form.password)?;

    let user = repo
        .create_user(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            image_url: non_blank(form.image_url.as_deref()),
        })
        .map_err(taken_or_store)?;

    info!("New user signed up: {} ({})", user.username, user.id);
    Ok(user)
}

/// Look the user up and check the password. Unknown usernames and wrong
/// passwords both come back as `Ok(None)`.
pub fn authenticate(
    repo: &dyn Repository,
    username: &str,
    password: &str,
) -> Result<Option<User>, AuthError> {
    let Some(user) = repo.find_user_by_username(username)? else {
        return Ok(None);
    };

    let parsed = match PasswordHash::new(&user.password) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unreadable password hash for user {}: {}", user.id, e);
            return Ok(None);
        }
    };

    let valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok();

    Ok(valid.then_some(user))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Shared by signup and profile edit.
pub fn validate_identity(username: &str, email: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::Invalid("Username is required.".into()));
    }
    if !email.contains('@') {
        return Err(AuthError::Invalid("Please enter a valid email.".into()));
    }
    Ok(())
}

/// Turn a unique-constraint failure into the field the user has to change.
pub fn taken_or_store(err: StoreError) -> AuthError {
    match err {
        StoreError::UniqueViolation(target) if target.ends_with("email") => AuthError::Taken("Email"),
        StoreError::UniqueViolation(_) => AuthError::Taken("Username"),
        other => AuthError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbler_db::Database;

    fn form(username: &str, email: &str, password: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            image_url: None,
        }
    }

    #[test]
    fn test_signup_hashes_password() {
        let db = Database::open_in_memory().unwrap();
        let user = signup(&db, &form("test1", "user1@test.com", "itsasecret")).unwrap();

        let stored = db.find_user_by_username("test1").unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        assert_ne!(stored.password, "itsasecret", "Password should be hashed");
        assert!(stored.password.starts_with("$argon2"));
    }

    #[test]
    fn test_signup_duplicate_username() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &form("test1", "user1@test.com", "itsasecret")).unwrap();

        let err = signup(&db, &form("test1", "other@test.com", "itsasecret")).unwrap_err();
        assert!(matches!(err, AuthError::Taken("Username")));

        let err = signup(&db, &form("test2", "user1@test.com", "itsasecret")).unwrap_err();
        assert!(matches!(err, AuthError::Taken("Email")));

        assert_eq!(db.list_users(None).unwrap().len(), 1);
    }

    #[test]
    fn test_signup_validation() {
        let db = Database::open_in_memory().unwrap();

        assert!(matches!(
            signup(&db, &form("  ", "a@b.com", "itsasecret")),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            signup(&db, &form("test1", "not-an-email", "itsasecret")),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            signup(&db, &form("test1", "a@b.com", "short")),
            Err(AuthError::Invalid(_))
        ));
        assert!(db.list_users(None).unwrap().is_empty());
    }

    #[test]
    fn test_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let user = signup(&db, &form("test1", "user1@test.com", "itsasecret")).unwrap();

        let ok = authenticate(&db, "test1", "itsasecret").unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));

        let bad_password = authenticate(&db, "test1", "wrongpassword").unwrap();
        let bad_username = authenticate(&db, "test2", "itsasecret").unwrap();
        assert!(bad_password.is_none());
        assert!(bad_username.is_none());
    }
}
