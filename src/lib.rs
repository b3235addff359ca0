// src/lib.rs
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod extract;
pub mod models;
pub mod paywall;
pub mod progress;
pub mod rate_limit;
pub mod repository;
pub mod session;
pub mod store;

use crate::auth::AuthService;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::PgRepository;
use crate::entitlement::EntitlementResolver;
use crate::progress::WatchProgressTracker;
use crate::rate_limit::RateLimiter;
use crate::repository::{
    ContentRepository, PlanRepository, SubscriptionRepository, UserRepository,
    WatchHistoryRepository,
};
use crate::session::SessionService;
use crate::store::KeyValueStore;
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

/// One handle per repository seam.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub contents: Arc<dyn ContentRepository>,
    pub watch_history: Arc<dyn WatchHistoryRepository>,
}

impl Repositories {
    pub fn postgres(repo: PgRepository) -> Self {
        let repo = Arc::new(repo);
        Self {
            users: repo.clone(),
            plans: repo.clone(),
            subscriptions: repo.clone(),
            contents: repo.clone(),
            watch_history: repo,
        }
    }
}

/// Shared by every worker; all members are cheap to clone and hold no per-request state.
pub struct AppState {
    pub auth: AuthService,
    pub sessions: Arc<SessionService>,
    pub limiter: RateLimiter,
    pub resolver: EntitlementResolver,
    pub progress: WatchProgressTracker,
    pub rate_limit: i64,
    pub rate_window: Duration,
}

impl AppState {
    pub fn new(
        config: &Config,
        repos: Repositories,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = Arc::new(SessionService::from_config(
            config,
            store.clone(),
            clock.clone(),
        ));
        let resolver = EntitlementResolver::new(
            repos.users.clone(),
            repos.plans.clone(),
            repos.subscriptions.clone(),
            repos.contents.clone(),
            clock.clone(),
        );
        let progress = WatchProgressTracker::new(
            repos.watch_history.clone(),
            repos.contents.clone(),
            resolver.clone(),
            clock.clone(),
        );
        Self {
            auth: AuthService::new(repos.users, sessions.clone(), clock),
            sessions,
            limiter: RateLimiter::new(store),
            resolver,
            progress,
            rate_limit: config.rate_limit,
            rate_window: config.rate_limit_window(),
        }
    }
}

/// Mounts every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    auth::init_routes(cfg);
    paywall::init_routes(cfg);
}
