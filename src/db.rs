// src/db.rs
use crate::error::{AppError, Result};
use crate::models::{Content, ContentFilter, Page, Plan, Subscription, User, WatchHistory};
use crate::repository::{
    ContentRepository, PlanRepository, SubscriptionRepository, UserRepository,
    WatchHistoryRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

/// Postgres-backed implementation of every repository seam.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn require_row(result: PgQueryResult, missing: AppError) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(missing);
    }
    Ok(())
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, bio, picture, phone, is_admin, created_at, updated_at";

#[async_trait]
impl UserRepository for PgRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, bio, picture, phone, is_admin, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.bio)
        .bind(&user.picture)
        .bind(&user.phone)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, password_hash = $3, name = $4, bio = $5, picture = $6, \
             phone = $7, is_admin = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.bio)
        .bind(&user.picture)
        .bind(&user.phone)
        .bind(user.is_admin)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::UserNotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, AppError::UserNotFound)
    }
}

const PLAN_COLUMNS: &str = "id, name, price, validity_days, access_level, max_devices_allowed, \
     resolution, description, is_active, created_at, updated_at";

#[async_trait]
impl PlanRepository for PgRepository {
    async fn create(&self, plan: &Plan) -> Result<()> {
        sqlx::query(
            "INSERT INTO plans (id, name, price, validity_days, access_level, max_devices_allowed, \
             resolution, description, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.price)
        .bind(plan.validity_days)
        .bind(plan.access_level)
        .bind(plan.max_devices_allowed)
        .bind(&plan.resolution)
        .bind(&plan.description)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Plan> {
        sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::PlanNotFound)
    }

    async fn get_by_name(&self, name: &str) -> Result<Plan> {
        sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::PlanNotFound)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE ($1 = false OR is_active = true) ORDER BY price ASC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn update(&self, plan: &Plan) -> Result<()> {
        let result = sqlx::query(
            "UPDATE plans SET name = $2, price = $3, validity_days = $4, access_level = $5, \
             max_devices_allowed = $6, resolution = $7, description = $8, is_active = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.price)
        .bind(plan.validity_days)
        .bind(plan.access_level)
        .bind(plan.max_devices_allowed)
        .bind(&plan.resolution)
        .bind(&plan.description)
        .bind(plan.is_active)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::PlanNotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, AppError::PlanNotFound)
    }
}

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plan_id, start_date, end_date, is_active, status, created_at, updated_at";

#[async_trait]
impl SubscriptionRepository for PgRepository {
    async fn create(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscriptions (id, user_id, plan_id, start_date, end_date, is_active, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.is_active)
        .bind(subscription.status)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::SubscriptionNotFound)
    }

    async fn get_active_by_user_id(&self, user_id: Uuid) -> Result<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE user_id = $1 AND is_active = true AND status = 'active' \
             ORDER BY end_date DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::SubscriptionNotFound)
    }

    async fn history_by_user_id(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subscriptions)
    }

    async fn update(&self, subscription: &Subscription) -> Result<()> {
        let result = sqlx::query(
            "UPDATE subscriptions SET plan_id = $2, start_date = $3, end_date = $4, is_active = $5, \
             status = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(subscription.id)
        .bind(subscription.plan_id)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.is_active)
        .bind(subscription.status)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::SubscriptionNotFound)
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE subscriptions SET is_active = false, status = 'cancelled', updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::SubscriptionNotFound)
    }
}

const CONTENT_COLUMNS: &str = "id, title, description, access_level, duration_seconds, \
     thumbnail_url, video_url, published, created_at, updated_at";

#[async_trait]
impl ContentRepository for PgRepository {
    async fn create(&self, content: &Content) -> Result<()> {
        sqlx::query(
            "INSERT INTO contents (id, title, description, access_level, duration_seconds, \
             thumbnail_url, video_url, published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(content.id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(content.access_level)
        .bind(content.duration_seconds)
        .bind(&content.thumbnail_url)
        .bind(&content.video_url)
        .bind(content.published)
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Content> {
        sqlx::query_as::<_, Content>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::ContentNotFound)
    }

    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<(Vec<Content>, i64)> {
        const WHERE: &str = "($1::boolean IS NULL OR published = $1) \
             AND ($2::access_level IS NULL OR access_level = $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contents WHERE {WHERE}"))
            .bind(filter.published)
            .bind(filter.access_level)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Content>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE {WHERE} \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.published)
        .bind(filter.access_level)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn update(&self, content: &Content) -> Result<()> {
        let result = sqlx::query(
            "UPDATE contents SET title = $2, description = $3, access_level = $4, \
             duration_seconds = $5, thumbnail_url = $6, video_url = $7, published = $8, \
             updated_at = $9 WHERE id = $1",
        )
        .bind(content.id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(content.access_level)
        .bind(content.duration_seconds)
        .bind(&content.thumbnail_url)
        .bind(&content.video_url)
        .bind(content.published)
        .bind(content.updated_at)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::ContentNotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, AppError::ContentNotFound)
    }
}

const HISTORY_COLUMNS: &str = "id, user_id, content_id, watched_seconds, total_seconds, status, \
     last_watched_at, created_at, updated_at";

#[async_trait]
impl WatchHistoryRepository for PgRepository {
    async fn create(&self, history: &WatchHistory) -> Result<()> {
        sqlx::query(
            "INSERT INTO watch_histories (id, user_id, content_id, watched_seconds, total_seconds, \
             status, last_watched_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(history.id)
        .bind(history.user_id)
        .bind(history.content_id)
        .bind(history.watched_seconds)
        .bind(history.total_seconds)
        .bind(history.status)
        .bind(history.last_watched_at)
        .bind(history.created_at)
        .bind(history.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<WatchHistory> {
        sqlx::query_as::<_, WatchHistory>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM watch_histories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::WatchHistoryNotFound)
    }

    async fn get_by_user_and_content(
        &self,
        user_id: Uuid,
        content_id: Uuid,
    ) -> Result<WatchHistory> {
        sqlx::query_as::<_, WatchHistory>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM watch_histories WHERE user_id = $1 AND content_id = $2"
        ))
        .bind(user_id)
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::WatchHistoryNotFound)
    }

    async fn get_by_user_id(&self, user_id: Uuid, page: Page) -> Result<(Vec<WatchHistory>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM watch_histories WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, WatchHistory>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM watch_histories WHERE user_id = $1 \
             ORDER BY last_watched_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn get_continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchHistory>> {
        let items = sqlx::query_as::<_, WatchHistory>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM watch_histories \
             WHERE user_id = $1 AND status <> 'completed' AND watched_seconds > 0 \
             ORDER BY last_watched_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update(&self, history: &WatchHistory) -> Result<()> {
        let result = sqlx::query(
            "UPDATE watch_histories SET watched_seconds = $2, total_seconds = $3, status = $4, \
             last_watched_at = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(history.id)
        .bind(history.watched_seconds)
        .bind(history.total_seconds)
        .bind(history.status)
        .bind(history.last_watched_at)
        .bind(history.updated_at)
        .execute(&self.pool)
        .await?;
        require_row(result, AppError::WatchHistoryNotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM watch_histories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, AppError::WatchHistoryNotFound)
    }
}
