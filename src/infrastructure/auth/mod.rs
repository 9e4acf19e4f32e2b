//! JWT Session Validator
//!
//! Validates HS256 access tokens issued by the platform's login service and
//! loads the identity they name. Tokens carrying a `sid` claim must also
//! match a live row in `user_sessions`, so logging out revokes the gateway
//! credential too.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::domain::{Identity, SessionValidator};
use crate::shared::error::AuthFailure;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Session row the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<i64, AuthFailure> {
        self.sub.parse().map_err(|_| AuthFailure::InvalidSession)
    }
}

/// Signature and expiry checks, independent of the database.
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl TokenDecoder {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, AuthFailure> {
        decode::<SessionClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthFailure::InvalidSession
            })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IdentityRow {
    id: i64,
    username: String,
    anonymous_alias: Option<String>,
    is_anonymous: bool,
    is_admin: bool,
}

impl IdentityRow {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            username: self.username,
            anonymous_alias: self.anonymous_alias,
            anonymous: self.is_anonymous,
            is_admin: self.is_admin,
        }
    }
}

/// PostgreSQL-backed [`SessionValidator`].
pub struct JwtSessionValidator {
    decoder: TokenDecoder,
    pool: PgPool,
}

impl JwtSessionValidator {
    pub fn new(settings: &JwtSettings, pool: PgPool) -> Self {
        Self {
            decoder: TokenDecoder::new(&settings.secret),
            pool,
        }
    }

    async fn session_is_live(&self, session_id: Uuid, user_id: i64) -> Result<bool, AuthFailure> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_sessions
                WHERE id = $1 AND user_id = $2
                  AND revoked_at IS NULL
                  AND expires_at > NOW()
            )
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn load_identity(&self, user_id: i64) -> Result<Option<Identity>, AuthFailure> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, username, anonymous_alias, is_anonymous, is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(IdentityRow::into_identity))
    }
}

fn unavailable(e: sqlx::Error) -> AuthFailure {
    AuthFailure::Unavailable(e.to_string())
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, credential: &str) -> Result<Identity, AuthFailure> {
        let claims = self.decoder.decode(credential)?;
        let user_id = claims.user_id()?;

        if let Some(session_id) = claims.sid {
            if !self.session_is_live(session_id, user_id).await? {
                return Err(AuthFailure::InvalidSession);
            }
        }

        self.load_identity(user_id)
            .await?
            .ok_or(AuthFailure::UserNotFound)
    }
}
