// src/session.rs
//! Access and renewal credentials with single-slot registration per identity.
//!
//! A credential is accepted only if it verifies against its kind's secret AND equals
//! the value currently registered under `token:{user}` or `refresh:{user}`. Issuing a
//! new session overwrites the registration, which revokes every earlier credential of
//! the same kind without a blocklist.
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Claims, TokenPair};
use crate::store::KeyValueStore;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

const RENEWAL_LIFETIME_FACTOR: i32 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Renewal,
}

impl TokenKind {
    fn namespace(self) -> &'static str {
        match self {
            TokenKind::Access => "token",
            TokenKind::Renewal => "refresh",
        }
    }

    pub fn registry_key(self, user_id: Uuid) -> String {
        format!("{}:{}", self.namespace(), user_id)
    }
}

pub struct SessionService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    access_secret: String,
    renewal_secret: String,
    access_lifetime: Duration,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        access_secret: impl Into<String>,
        renewal_secret: impl Into<String>,
        access_lifetime: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            access_secret: access_secret.into(),
            renewal_secret: renewal_secret.into(),
            access_lifetime,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            store,
            clock,
            config.jwt_secret.clone(),
            config.jwt_refresh_secret.clone(),
            Duration::hours(config.jwt_expiration_hours),
        )
    }

    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Renewal => self.access_lifetime * RENEWAL_LIFETIME_FACTOR,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Renewal => self.renewal_secret.as_bytes(),
        }
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        email: &str,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            is_admin,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.lifetime(kind)).timestamp(),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
    }

    async fn register(&self, kind: TokenKind, user_id: Uuid, token: &str) -> Result<()> {
        let ttl = self
            .lifetime(kind)
            .to_std()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.store.set(&kind.registry_key(user_id), token, ttl).await
    }

    /// Signs a fresh access/renewal pair and registers both, replacing any session the
    /// identity already had.
    pub async fn issue_session(
        &self,
        user_id: Uuid,
        email: &str,
        is_admin: bool,
    ) -> Result<TokenPair> {
        let now = self.clock.now();
        let token = self.sign(TokenKind::Access, user_id, email, is_admin, now)?;
        let refresh = self.sign(TokenKind::Renewal, user_id, email, is_admin, now)?;

        self.register(TokenKind::Access, user_id, &token).await?;
        self.register(TokenKind::Renewal, user_id, &refresh).await?;

        tracing::info!("Issued session for user {}", user_id);
        Ok(TokenPair { token, refresh })
    }

    pub async fn validate_session(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        // time bounds are checked against the injected clock below
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &validation,
        )?
        .claims;

        let now = self.clock.now().timestamp();
        if claims.nbf > now {
            return Err(AppError::TokenInvalid);
        }
        if now >= claims.exp {
            return Err(AppError::TokenExpired);
        }

        match self.store.get(&kind.registry_key(claims.user_id)).await? {
            Some(registered) if registered == token => Ok(claims),
            Some(_) => {
                tracing::debug!("Superseded {:?} token for user {}", kind, claims.user_id);
                Err(AppError::TokenExpired)
            }
            None => Err(AppError::TokenExpired),
        }
    }

    /// Re-issues both credentials for an identity whose renewal token was already
    /// validated, restarting both registration lifetimes.
    pub async fn refresh_session(
        &self,
        user_id: Uuid,
        email: &str,
        is_admin: bool,
    ) -> Result<TokenPair> {
        let tokens = self.issue_session(user_id, email, is_admin).await?;
        tracing::debug!("Refreshed session for user {}", user_id);
        Ok(tokens)
    }

    /// Drops both registrations so no outstanding credential validates.
    pub async fn end_session(&self, user_id: Uuid) -> Result<()> {
        self.store
            .delete(&TokenKind::Access.registry_key(user_id))
            .await?;
        self.store
            .delete(&TokenKind::Renewal.registry_key(user_id))
            .await?;
        tracing::info!("Ended session for user {}", user_id);
        Ok(())
    }
}
