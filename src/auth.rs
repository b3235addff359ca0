// src/auth.rs
use crate::AppState;
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::extract::{AuthUser, RenewalUser};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User};
use crate::repository::UserRepository;
use crate::session::SessionService;
use actix_web::{HttpResponse, get, post, put, web};
use bcrypt::{DEFAULT_COST, hash, verify};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
    cfg.service(refresh);
    cfg.service(logout);
    cfg.service(get_profile);
    cfg.service(update_profile);
}

/// Registration, credential checks and profile upkeep on top of the session service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionService>,
    clock: Arc<dyn Clock>,
    hash_cost: u32,
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    web::block(move || hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing was cancelled: {}", e)))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
async fn verify_password(password: String, password_hash: String) -> Result<bool> {
    let verified = web::block(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check was cancelled: {}", e)))?;
    Ok(verified.unwrap_or(false))
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            hash_cost: DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        if req.email.trim().is_empty() || req.name.trim().is_empty() {
            return Err(AppError::ValidationFailed(
                "email and name are required".to_string(),
            ));
        }
        if req.password.len() < 6 {
            return Err(AppError::ValidationFailed(
                "password must be at least 6 characters".to_string(),
            ));
        }
        match self.users.get_by_email(&req.email).await {
            Ok(_) => return Err(AppError::UserExists),
            Err(AppError::UserNotFound) => {}
            Err(e) => return Err(e),
        }

        let password_hash = hash_password(req.password, self.hash_cost).await?;
        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            email: req.email,
            password_hash,
            name: req.name,
            bio: req.bio,
            picture: req.picture,
            phone: req.phone,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        tracing::info!("Registered user {}", user.id);

        let tokens = self
            .sessions
            .issue_session(user.id, &user.email, user.is_admin)
            .await?;
        Ok(AuthResponse { tokens, user })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let user = match self.users.get_by_email(&req.email).await {
            Ok(user) => user,
            Err(AppError::UserNotFound) => return Err(AppError::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if !verify_password(req.password, user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self
            .sessions
            .issue_session(user.id, &user.email, user.is_admin)
            .await?;
        Ok(AuthResponse { tokens, user })
    }

    /// Re-issues credentials after the renewal token was validated. An identity that no
    /// longer exists cannot renew.
    pub async fn refresh(&self, user_id: Uuid) -> Result<AuthResponse> {
        let user = match self.users.get_by_id(user_id).await {
            Ok(user) => user,
            Err(AppError::UserNotFound) => return Err(AppError::TokenInvalid),
            Err(e) => return Err(e),
        };
        let tokens = self
            .sessions
            .refresh_session(user.id, &user.email, user.is_admin)
            .await?;
        Ok(AuthResponse { tokens, user })
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<()> {
        self.sessions.end_session(user_id).await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User> {
        self.users.get_by_id(user_id).await
    }

    /// Only non-empty fields overwrite the stored profile.
    pub async fn update_profile(&self, user_id: Uuid, req: UpdateProfileRequest) -> Result<User> {
        let mut user = self.users.get_by_id(user_id).await?;
        if !req.name.is_empty() {
            user.name = req.name;
        }
        if !req.bio.is_empty() {
            user.bio = req.bio;
        }
        if !req.picture.is_empty() {
            user.picture = req.picture;
        }
        if !req.phone.is_empty() {
            user.phone = req.phone;
        }
        user.updated_at = self.clock.now();
        self.users.update(&user).await?;
        Ok(user)
    }
}

#[post("/auth/register")]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let response = state.auth.register(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let response = state.auth.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/auth/refresh")]
pub async fn refresh(state: web::Data<AppState>, user: RenewalUser) -> Result<HttpResponse> {
    let response = state.auth.refresh(user.0.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/auth/logout")]
pub async fn logout(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    state.auth.logout(user.id()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out" })))
}

#[get("/users/profile")]
pub async fn get_profile(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let profile = state.auth.get_profile(user.id()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[put("/users/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let profile = state.auth.update_profile(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}
