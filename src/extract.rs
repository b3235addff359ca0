// src/extract.rs
//! Request identity. Every extractor here also charges the caller's rate-limit window:
//! `user:{id}` when a credential was presented, otherwise the peer address.
use crate::AppState;
use crate::error::AppError;
use crate::models::Claims;
use crate::rate_limit::RateLimiter;
use crate::session::TokenKind;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, web};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

type ExtractFuture<T> = Pin<Box<dyn Future<Output = Result<T, AppError>>>>;

/// Caller presenting a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }
}

/// Caller presenting a valid renewal token.
#[derive(Debug, Clone)]
pub struct RenewalUser(pub Claims);

/// Anonymous caller, or one presenting a valid access token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|c| c.user_id)
    }
}

fn state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("application state not configured".to_string()))
}

/// `None` when the header is absent; a malformed header is an error.
fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(value) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::Unauthorized)?;
    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Ok(Some(token.to_string())),
        _ => Err(AppError::Unauthorized),
    }
}

/// Socket peer IP. Forwarding headers are client-controlled and ignored.
fn peer_identity(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn charge(state: &AppState, identity: &str) -> Result<(), AppError> {
    let window = state.rate_window;
    if state.limiter.allow(identity, state.rate_limit, window).await? {
        Ok(())
    } else {
        Err(AppError::RateLimited {
            max: state.rate_limit,
            window_secs: window.as_secs(),
        })
    }
}

async fn authenticate(req: HttpRequest, kind: TokenKind) -> Result<Claims, AppError> {
    let state = state(&req)?;
    let token = bearer_token(&req)?.ok_or(AppError::Unauthorized)?;
    let claims = state.sessions.validate_session(&token, kind).await?;
    charge(&state, &RateLimiter::user_identity(claims.user_id)).await?;
    Ok(claims)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(req, TokenKind::Access).await.map(AuthUser) })
    }
}

impl FromRequest for RenewalUser {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(req, TokenKind::Renewal).await.map(RenewalUser) })
    }
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            if bearer_token(&req)?.is_some() {
                return authenticate(req, TokenKind::Access)
                    .await
                    .map(|claims| MaybeUser(Some(claims)));
            }
            let state = state(&req)?;
            charge(&state, &peer_identity(&req)).await?;
            Ok(MaybeUser(None))
        })
    }
}
