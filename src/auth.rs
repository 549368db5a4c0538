use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
};

/// The role granted access to every `/api/admin` route.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Name of the cookie a browser session carries the token in.
pub const TOKEN_COOKIE: &str = "token";

/// Claims
///
/// The payload expected inside a session JWT issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's identifier at the identity provider.
    pub sub: String,
    /// The user's role, e.g. `ADMIN` or `EDITOR`.
    pub role: String,
    /// Expiration Time (exp): Timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat): Timestamp when the JWT was issued.
    pub iat: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }
}

/// bearer_token
///
/// The token from `Authorization: Bearer <token>`, falling back to the `token` cookie.
fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
            .map(|(_, value)| value.to_string())
    })
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler or middleware argument. The process:
/// 1. Local Bypass: in `Env::Local`, the `x-user-id` header (with an optional
///    `x-user-role`, defaulting to ADMIN) stands in for a session.
/// 2. Token Extraction: Bearer header first, then the `token` cookie.
/// 3. JWT Decoding: HS256 with expiry validation against the configured secret.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // 1. Local Development Bypass Check
        if config.env == Env::Local {
            let header_value = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            };
            if let Some(id) = header_value("x-user-id") {
                let role = header_value("x-user-role").unwrap_or_else(|| ADMIN_ROLE.to_string());
                tracing::debug!(user = %id, %role, "local auth bypass");
                return Ok(AuthUser { id, role });
            }
        }

        // 2. Token Extraction
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        // 3. Decode and Validate the Token
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(&token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!(reason = ?other, "rejected invalid token"),
            }
            AppError::Unauthorized
        })?;

        Ok(AuthUser {
            id: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }
}

/// AdminUser
///
/// An `AuthUser` whose role is ADMIN. Any other role is rejected with
/// `AppError::Forbidden` (403).
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user = %user.id, role = %user.role, "non-admin denied");
            return Err(AppError::Forbidden(user.role));
        }
        Ok(AdminUser(user))
    }
}
