// src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entitlement tier shared by plans and content. Declaration order is the tier order.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "access_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Free,
    Basic,
    Premium,
}

impl AccessLevel {
    /// Whether a holder of `self` may view content that requires `required`.
    pub fn unlocks(self, required: AccessLevel) -> bool {
        self >= required
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "watch_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Started,
    Paused,
    Completed,
}

/// Share of the total duration at which a title counts as watched.
const COMPLETION_NUMERATOR: i64 = 9;
const COMPLETION_DENOMINATOR: i64 = 10;

impl WatchStatus {
    /// `watched / total >= 0.90`, computed in integers so the boundary is exact.
    /// A zero or negative total never completes.
    pub fn is_completion(watched_seconds: i32, total_seconds: i32) -> bool {
        if total_seconds <= 0 {
            return false;
        }
        i64::from(watched_seconds) * COMPLETION_DENOMINATOR
            >= i64::from(total_seconds) * COMPLETION_NUMERATOR
    }

    /// Status for a progress report against a (user, content) pair.
    pub fn for_report(watched_seconds: i32, total_seconds: i32) -> Self {
        if Self::is_completion(watched_seconds, total_seconds) {
            WatchStatus::Completed
        } else if watched_seconds > 0 {
            WatchStatus::Paused
        } else {
            WatchStatus::Started
        }
    }

    /// Status for an explicit update of an existing record; there is no zero case.
    pub fn for_update(watched_seconds: i32, total_seconds: i32) -> Self {
        if Self::is_completion(watched_seconds, total_seconds) {
            WatchStatus::Completed
        } else {
            WatchStatus::Paused
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub bio: String,
    pub picture: String,
    pub phone: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub validity_days: i32,
    pub access_level: AccessLevel,
    pub max_devices_allowed: i32,
    pub resolution: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Starts an active subscription on `plan` at `now`.
    pub fn start(user_id: Uuid, plan: &Plan, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan.id,
            start_date: now,
            end_date: now + Duration::days(i64::from(plan.validity_days)),
            is_active: true,
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_date
    }

    /// Status this record should have at `now`. Pure; persisting it is the caller's job.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if self.is_expired(now) => SubscriptionStatus::Expired,
            status => status,
        }
    }

    /// Active flag set, active status, and not past `end_date`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.effective_status(now) == SubscriptionStatus::Active
    }

    pub fn mark_expired(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.status = SubscriptionStatus::Expired;
        self.updated_at = now;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Content {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub access_level: AccessLevel,
    pub duration_seconds: i32,
    pub thumbnail_url: String,
    pub video_url: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct WatchHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub watched_seconds: i32,
    pub total_seconds: i32,
    pub status: WatchStatus,
    pub last_watched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchHistory {
    pub fn progress_percentage(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        f64::from(self.watched_seconds) / f64::from(self.total_seconds) * 100.0
    }

    pub fn is_completed(&self) -> bool {
        self.status == WatchStatus::Completed
            || WatchStatus::is_completion(self.watched_seconds, self.total_seconds)
    }
}

/// Typed predicate for catalog listings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContentFilter {
    pub published: Option<bool>,
    pub access_level: Option<AccessLevel>,
}

impl ContentFilter {
    pub fn published_only() -> Self {
        Self {
            published: Some(true),
            access_level: None,
        }
    }

    pub fn matches(&self, content: &Content) -> bool {
        self.published.is_none_or(|p| content.published == p)
            && self.access_level.is_none_or(|l| content.access_level == l)
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Page {
    /// Clamps to sane bounds before the page reaches a repository.
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, 100),
            offset: self.offset.max(0),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub jti: Uuid,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenPair {
    pub token: String,
    pub refresh: String,
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub picture: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct WatchProgressRequest {
    pub content_id: Uuid,
    pub watched_seconds: i32,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub watched_seconds: i32,
}

#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(level: AccessLevel, validity_days: i32) -> Plan {
        let now = Utc::now();
        Plan {
            id: Uuid::new_v4(),
            name: "plan".into(),
            price: 999,
            validity_days,
            access_level: level,
            max_devices_allowed: 1,
            resolution: "1080p".into(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_levels_are_totally_ordered() {
        use AccessLevel::*;
        assert!(Free < Basic && Basic < Premium);
        assert!(Basic.unlocks(Free));
        assert!(Basic.unlocks(Basic));
        assert!(!Basic.unlocks(Premium));
        assert!(Premium.unlocks(Premium));
        assert!(!Free.unlocks(Basic));
    }

    #[test]
    fn completion_boundary_is_inclusive() {
        assert!(WatchStatus::is_completion(90, 100));
        assert!(WatchStatus::is_completion(6480, 7200));
        assert!(!WatchStatus::is_completion(89, 100));
        assert!(!WatchStatus::is_completion(6479, 7200));
        assert!(!WatchStatus::is_completion(0, 0));
    }

    #[test]
    fn report_and_update_statuses_differ_only_at_zero() {
        assert_eq!(WatchStatus::for_report(0, 100), WatchStatus::Started);
        assert_eq!(WatchStatus::for_update(0, 100), WatchStatus::Paused);
        assert_eq!(WatchStatus::for_report(10, 100), WatchStatus::Paused);
        assert_eq!(WatchStatus::for_update(95, 100), WatchStatus::Completed);
    }

    #[test]
    fn subscription_expires_after_end_date() {
        let t0 = Utc::now();
        let sub = Subscription::start(Uuid::new_v4(), &plan(AccessLevel::Premium, 30), t0);

        assert_eq!(sub.end_date, t0 + Duration::days(30));
        assert!(sub.is_live(t0 + Duration::days(30)));
        assert_eq!(
            sub.effective_status(t0 + Duration::days(31)),
            SubscriptionStatus::Expired
        );
        assert!(!sub.is_live(t0 + Duration::days(31)));
    }

    #[test]
    fn cancelled_subscription_stays_cancelled() {
        let t0 = Utc::now();
        let mut sub = Subscription::start(Uuid::new_v4(), &plan(AccessLevel::Basic, 30), t0);
        sub.is_active = false;
        sub.status = SubscriptionStatus::Cancelled;
        assert_eq!(
            sub.effective_status(t0 + Duration::days(60)),
            SubscriptionStatus::Cancelled
        );
    }

    #[test]
    fn page_is_clamped() {
        let page = Page {
            limit: 1000,
            offset: -5,
        }
        .normalized();
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);
    }
}
