// src/repository.rs
//! Storage seams consumed by the core. Every finder returns the entity or its
//! entity-specific not-found error; none returns a placeholder value.
use crate::error::Result;
use crate::models::{Content, ContentFilter, Page, Plan, Subscription, User, WatchHistory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<User>;
    async fn get_by_email(&self, email: &str) -> Result<User>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn create(&self, plan: &Plan) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<Plan>;
    async fn get_by_name(&self, name: &str) -> Result<Plan>;
    async fn list(&self, active_only: bool) -> Result<Vec<Plan>>;
    async fn update(&self, plan: &Plan) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<Subscription>;
    /// Latest-ending subscription flagged active with status `active`. The end date is
    /// not checked here; expiry is the resolver's call.
    async fn get_active_by_user_id(&self, user_id: Uuid) -> Result<Subscription>;
    /// Newest first.
    async fn history_by_user_id(&self, user_id: Uuid) -> Result<Vec<Subscription>>;
    async fn update(&self, subscription: &Subscription) -> Result<()>;
    /// Clears the active flag and sets status `cancelled` as of `now`.
    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create(&self, content: &Content) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<Content>;
    /// Returns the requested page and the total number of matches.
    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<(Vec<Content>, i64)>;
    async fn update(&self, content: &Content) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait WatchHistoryRepository: Send + Sync {
    async fn create(&self, history: &WatchHistory) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<WatchHistory>;
    async fn get_by_user_and_content(&self, user_id: Uuid, content_id: Uuid)
    -> Result<WatchHistory>;
    /// Most recently watched first, with the total count for the user.
    async fn get_by_user_id(&self, user_id: Uuid, page: Page) -> Result<(Vec<WatchHistory>, i64)>;
    /// Unfinished records with some progress, most recently watched first.
    async fn get_continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchHistory>>;
    async fn update(&self, history: &WatchHistory) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}
