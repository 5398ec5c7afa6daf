use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// The payload signed into every bearer token. The role is informational only:
/// the Auth Guard always reloads the user and trusts the stored role.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub role: Role,
    /// Expiration time (seconds since the epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an
/// argument; guards read it from the request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// issue_token
///
/// Signs an HS256 token for `user`, valid for `config.jwt_expiry_hours`.
pub fn issue_token(user: &User, config: &AppConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.jwt_expiry_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("token encoding failed: {e}")))
}

/// Hashes a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

/// Verifies a plaintext password against a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// Turns a repository lookup into an identity, rejecting unknown and
/// deactivated accounts.
fn resolve_identity(user: Option<User>) -> AppResult<AuthUser> {
    let user = user.ok_or_else(|| AppError::unauthenticated("User not found"))?;
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "rejected request from deactivated account");
        return Err(AppError::unauthenticated("Account is deactivated"));
    }
    Ok(AuthUser::from(&user))
}

/// Validates a bearer token and returns the user id it names.
pub fn decode_token(token: &str, config: &AppConfig) -> AppResult<Uuid> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims.sub)
    .map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        AppError::unauthenticated("Invalid or expired token")
    })
}

/// AuthUser Extractor (Auth Guard)
///
/// Resolution order:
/// 1. An identity already placed in the request extensions by `guards::authenticate`.
/// 2. `Env::Local` with `AUTH_DEV_BYPASS` enabled: an `x-user-id` header naming an existing user.
/// 3. `Authorization: Bearer <token>`, validated and reloaded from the repository.
///
/// Every failure rejects with `AppError::Unauthenticated` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(resolved.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Opt-in local development bypass. Deactivated accounts are still rejected.
        if config.dev_auth_bypass && config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return resolve_identity(Some(user));
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthenticated("Access denied. No token provided"))?;

        let user_id = decode_token(token.trim(), &config)?;

        // Reload so deleted or deactivated users lose access immediately.
        resolve_identity(repo.get_user(user_id).await?)
    }
}
