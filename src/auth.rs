use std::sync::OnceLock;

use regex::Regex;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{created, done, ok};
use crate::core::errors::ApiError;
use crate::core::helpers::{
    bearer_token, hash_password, is_expired, new_token, non_empty, now_iso, parse_json, sanitize_text,
    verify_password,
};
use crate::core::kv::{KvStore, KvStoreExt};
use crate::core::multipart::MultipartForm;
use crate::media::{self, MediaFolder, UploadKind};
use crate::models::dto::{ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest};
use crate::models::models::{ResetData, TokenData, User};
use crate::users;

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("Regex should compile"))
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile"))
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::BadRequest(
            "Username can only contain letters, numbers, underscores and dots".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid email address".to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_name(label: &str, value: &str) -> Result<String, ApiError> {
    let clean = sanitize_text(value);
    if clean.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", label)));
    }
    if clean.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            label, MAX_NAME_LENGTH
        )));
    }
    Ok(clean)
}

// === Tokens ===

pub fn session_max_age(config: &Config) -> chrono::Duration {
    chrono::Duration::hours(config.token_expiration_hours)
}

/// Create a session token for `user_id` and index it under the user.
/// Sessions of the user that are gone or past `max_age` are dropped from the index.
pub fn issue_token(store: &dyn KvStore, user_id: u64, max_age: chrono::Duration) -> anyhow::Result<String> {
    let existing: Vec<String> = store.get_json(&user_tokens_key(user_id))?.unwrap_or_default();
    let mut tokens = Vec::with_capacity(existing.len() + 1);
    for token in existing {
        match store.get_json::<TokenData>(&token_key(&token))? {
            Some(data) if !is_expired(&data.created_at, max_age) => tokens.push(token),
            Some(_) => store.delete(&token_key(&token))?,
            None => {}
        }
    }

    let token = new_token();
    let data = TokenData {
        user_id,
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    tokens.push(token.clone());
    store.set_json(&user_tokens_key(user_id), &tokens)?;
    Ok(token)
}

fn forget_session(store: &dyn KvStore, user_id: u64, token: &str) -> anyhow::Result<()> {
    store.delete(&token_key(token))?;
    let mut tokens: Vec<String> = store.get_json(&user_tokens_key(user_id))?.unwrap_or_default();
    tokens.retain(|t| t != token);
    if tokens.is_empty() {
        store.delete(&user_tokens_key(user_id))
    } else {
        store.set_json(&user_tokens_key(user_id), &tokens)
    }
}

/// Revoke every session of `user_id` except `keep`.
pub fn revoke_tokens(store: &dyn KvStore, user_id: u64, keep: Option<&str>) -> anyhow::Result<()> {
    let tokens: Vec<String> = store.get_json(&user_tokens_key(user_id))?.unwrap_or_default();
    let mut kept = Vec::new();
    for token in tokens {
        if Some(token.as_str()) == keep {
            kept.push(token);
        } else {
            store.delete(&token_key(&token))?;
        }
    }
    if kept.is_empty() {
        store.delete(&user_tokens_key(user_id))
    } else {
        store.set_json(&user_tokens_key(user_id), &kept)
    }
}

/// Create a password reset token for `user_id`. Only the latest one stays valid.
pub fn create_reset_token(store: &dyn KvStore, user_id: u64) -> anyhow::Result<String> {
    clear_reset_token(store, user_id)?;
    let token = new_token();
    let data = ResetData {
        user_id,
        created_at: now_iso(),
    };
    store.set_json(&reset_key(&token), &data)?;
    store.set_json(&user_reset_key(user_id), &token)?;
    Ok(token)
}

/// Drop the pending reset token of `user_id`, if any.
pub fn clear_reset_token(store: &dyn KvStore, user_id: u64) -> anyhow::Result<()> {
    if let Some(pending) = store.get_json::<String>(&user_reset_key(user_id))? {
        store.delete(&reset_key(&pending))?;
        store.delete(&user_reset_key(user_id))?;
    }
    Ok(())
}

/// Resolve the bearer token to its user id, if the session is still valid.
pub fn validate_token(ctx: &AppContext, req: &Request) -> anyhow::Result<Option<u64>> {
    let Some(token) = bearer_token(req) else {
        return Ok(None);
    };
    let store = ctx.store();
    let Some(data) = store.get_json::<TokenData>(&token_key(token))? else {
        return Ok(None);
    };

    if is_expired(&data.created_at, session_max_age(ctx.config())) {
        forget_session(store, data.user_id, token)?;
        return Ok(None);
    }
    // Tokens of deleted users are dead even if cleanup missed them.
    if store.get(&user_key(data.user_id))?.is_none() {
        return Ok(None);
    }
    Ok(Some(data.user_id))
}

pub fn require_user_id(ctx: &AppContext, req: &Request) -> Result<u64, ApiError> {
    validate_token(ctx, req)?.ok_or(ApiError::Unauthorized)
}

pub fn require_user(ctx: &AppContext, req: &Request) -> Result<User, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    users::load_user(ctx.store(), user_id)?.ok_or(ApiError::Unauthorized)
}

/// The caller's id when a valid token is sent; anonymous otherwise.
pub fn optional_user_id(ctx: &AppContext, req: &Request) -> Result<Option<u64>, ApiError> {
    Ok(validate_token(ctx, req)?)
}

// === HTTP Handlers ===

pub fn register(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let form = MultipartForm::parse(req)?;
    let store = ctx.store();

    let username = form.required_text("username")?.to_string();
    validate_username(&username)?;
    let email = form.required_text("email")?.to_lowercase();
    validate_email(&email)?;
    let password = form.required_raw_text("password")?;
    validate_password(password)?;
    let name = validate_name("Name", form.text("name").unwrap_or_default())?;
    let surname = validate_name("Surname", form.text("surname").unwrap_or_default())?;

    if store.get(&user_name_key(&username))?.is_some() {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }
    if store.get(&user_email_key(&email))?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let profile_picture = match form.file("profilePicture") {
        Some(file) => {
            let ext = media::validate_upload(UploadKind::ProfilePicture, &file.file_name, &file.data)?;
            Some(media::store_file(store, MediaFolder::ProfilePics, ext, &file.data)?)
        }
        None => None,
    };

    let id = store.next_id("user")?;
    let user = User {
        id,
        username: username.clone(),
        email: email.clone(),
        password: hash_password(password)?,
        name,
        surname,
        middle_name: non_empty(form.text("middleName")),
        phone_number: non_empty(form.text("phoneNumber")),
        city: non_empty(form.text("city")),
        state: non_empty(form.text("state")),
        country: non_empty(form.text("country")),
        profile_picture,
        generation_tokens: ctx.config().initial_generation_tokens,
        created_at: now_iso(),
    };

    store.set_json(&user_key(id), &user)?;
    store.set_json(&user_name_key(&username), &id)?;
    store.set_json(&user_email_key(&email), &id)?;

    info!(user_id = id, %username, "user registered");
    created("Registration successful", users::build_profile(ctx, &user, Some(id))?)
}

pub fn login(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let creds: LoginRequest = parse_json(req)?;
    let store = ctx.store();

    let user = match store.get_json::<u64>(&user_email_key(creds.email.trim()))? {
        Some(id) => users::load_user(store, id)?,
        None => None,
    };
    let user = match user {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            warn!(email = %creds.email, "rejected login");
            return Err(ApiError::Unauthorized);
        }
    };

    let token = issue_token(store, user.id, session_max_age(ctx.config()))?;
    info!(user_id = user.id, "user logged in");
    ok("Login successful", LoginResponse { token })
}

pub fn logout(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized)?;
    let store = ctx.store();
    if let Some(data) = store.get_json::<TokenData>(&token_key(token))? {
        forget_session(store, data.user_id, token)?;
    }
    done("Logged out successfully")
}

pub fn forgot_password(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let body: ForgotPasswordRequest = parse_json(req)?;
    let store = ctx.store();

    if let Some(user_id) = store.get_json::<u64>(&user_email_key(body.email.trim()))? {
        let token = create_reset_token(store, user_id)?;
        // No mail delivery; operators hand the token over out of band.
        info!(user_id, reset_token = %token, "password reset requested");
    }
    done("If the email is registered, a reset link has been sent")
}

pub fn reset_password(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let body: ResetPasswordRequest = parse_json(req)?;
    validate_password(&body.new_password)?;
    let store = ctx.store();

    let invalid = || ApiError::BadRequest("Invalid or expired reset token".to_string());
    let data = store.get_json::<ResetData>(&reset_key(&body.token))?.ok_or_else(invalid)?;
    clear_reset_token(store, data.user_id)?;
    store.delete(&reset_key(&body.token))?;

    let max_age = chrono::Duration::minutes(ctx.config().reset_token_minutes);
    if is_expired(&data.created_at, max_age) {
        return Err(invalid());
    }
    let mut user = users::load_user(store, data.user_id)?.ok_or_else(invalid)?;

    user.password = hash_password(&body.new_password)?;
    store.set_json(&user_key(user.id), &user)?;
    revoke_tokens(store, user.id, None)?;

    info!(user_id = user.id, "password reset");
    done("Password has been reset")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;

    fn day() -> chrono::Duration {
        chrono::Duration::hours(24)
    }

    fn backdate(store: &dyn KvStore, token: &str, hours: i64) {
        let mut data: TokenData = store.get_json(&token_key(token)).unwrap().unwrap();
        data.created_at = (chrono::Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
        store.set_json(&token_key(token), &data).unwrap();
    }

    #[test]
    fn usernames_follow_the_allowed_pattern() {
        assert!(validate_username("ada.l_92").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("no spaces").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn emails_and_passwords_are_checked() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn names_are_sanitised() {
        assert_eq!(validate_name("Name", " <i>Ada</i> ").unwrap(), "Ada");
        assert!(validate_name("Name", "<b></b>").is_err());
    }

    #[test]
    fn revoking_keeps_only_the_current_session() {
        let store = MemoryStore::new();
        let a = issue_token(&store, 1, day()).unwrap();
        let b = issue_token(&store, 1, day()).unwrap();
        revoke_tokens(&store, 1, Some(&b)).unwrap();
        assert!(store.get(&token_key(&a)).unwrap().is_none());
        assert!(store.get(&token_key(&b)).unwrap().is_some());
        let remaining: Vec<String> = store.get_json(&user_tokens_key(1)).unwrap().unwrap();
        assert_eq!(remaining, vec![b]);
    }

    #[test]
    fn expired_sessions_leave_the_user_index() {
        let store = MemoryStore::new();
        let stale = issue_token(&store, 1, day()).unwrap();
        let live = issue_token(&store, 1, day()).unwrap();
        backdate(&store, &stale, 48);

        let fresh = issue_token(&store, 1, day()).unwrap();
        let tokens: Vec<String> = store.get_json(&user_tokens_key(1)).unwrap().unwrap();
        assert_eq!(tokens, vec![live, fresh]);
        assert!(store.get(&token_key(&stale)).unwrap().is_none());
    }

    #[test]
    fn validating_an_expired_session_forgets_it() {
        let ctx = AppContext::in_memory(Config::default());
        let store = ctx.store();
        let token = issue_token(store, 7, day()).unwrap();
        backdate(store, &token, 48);

        let req = Request::builder()
            .method(spin_sdk::http::Method::Get)
            .uri("/api/User")
            .header("Authorization", format!("Bearer {}", token))
            .body(Vec::new())
            .build();
        assert_eq!(validate_token(&ctx, &req).unwrap(), None);
        assert!(store.get(&token_key(&token)).unwrap().is_none());
        assert!(store.get(&user_tokens_key(7)).unwrap().is_none());
    }

    #[test]
    fn only_the_latest_reset_token_is_kept() {
        let store = MemoryStore::new();
        let first = create_reset_token(&store, 3).unwrap();
        let second = create_reset_token(&store, 3).unwrap();
        assert!(store.get(&reset_key(&first)).unwrap().is_none());
        assert!(store.get(&reset_key(&second)).unwrap().is_some());

        clear_reset_token(&store, 3).unwrap();
        assert!(store.get(&reset_key(&second)).unwrap().is_none());
        assert!(store.get(&user_reset_key(3)).unwrap().is_none());
    }
}
