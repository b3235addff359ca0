#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use streamgate::Repositories;
use streamgate::clock::Clock;
use streamgate::entitlement::EntitlementResolver;
use streamgate::error::{AppError, Result};
use streamgate::models::{
    AccessLevel, Content, ContentFilter, Page, Plan, Subscription, SubscriptionStatus, User,
    WatchHistory, WatchStatus,
};
use streamgate::progress::WatchProgressTracker;
use streamgate::repository::{
    ContentRepository, PlanRepository, SubscriptionRepository, UserRepository,
    WatchHistoryRepository,
};
use uuid::Uuid;

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    users: Mutex<HashMap<Uuid, User>>,
    plans: Mutex<HashMap<Uuid, Plan>>,
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    contents: Mutex<HashMap<Uuid, Content>>,
    histories: Mutex<HashMap<Uuid, WatchHistory>>,
}

impl MemoryRepository {
    pub fn subscription(&self, id: Uuid) -> Subscription {
        self.subscriptions.lock().unwrap()[&id].clone()
    }

    pub fn subscriptions_of(&self, user_id: Uuid) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn set_plan_active(&self, id: Uuid, active: bool) {
        self.plans.lock().unwrap().get_mut(&id).unwrap().is_active = active;
    }
}

fn put<T: Clone>(
    map: &Mutex<HashMap<Uuid, T>>,
    id: Uuid,
    value: &T,
    missing: AppError,
) -> Result<()> {
    let mut map = map.lock().unwrap();
    if !map.contains_key(&id) {
        return Err(missing);
    }
    map.insert(id, value.clone());
    Ok(())
}

fn remove<T>(map: &Mutex<HashMap<Uuid, T>>, id: Uuid, missing: AppError) -> Result<()> {
    map.lock().unwrap().remove(&id).map(|_| ()).ok_or(missing)
}

fn find<T: Clone>(map: &Mutex<HashMap<Uuid, T>>, id: Uuid, missing: AppError) -> Result<T> {
    map.lock().unwrap().get(&id).cloned().ok_or(missing)
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create(&self, user: &User) -> Result<()> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }
    async fn get_by_id(&self, id: Uuid) -> Result<User> {
        find(&self.users, id, AppError::UserNotFound)
    }
    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }
    async fn update(&self, user: &User) -> Result<()> {
        put(&self.users, user.id, user, AppError::UserNotFound)
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        remove(&self.users, id, AppError::UserNotFound)
    }
}

#[async_trait]
impl PlanRepository for MemoryRepository {
    async fn create(&self, plan: &Plan) -> Result<()> {
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(())
    }
    async fn get_by_id(&self, id: Uuid) -> Result<Plan> {
        find(&self.plans, id, AppError::PlanNotFound)
    }
    async fn get_by_name(&self, name: &str) -> Result<Plan> {
        self.plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned()
            .ok_or(AppError::PlanNotFound)
    }
    async fn list(&self, active_only: bool) -> Result<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price);
        Ok(plans)
    }
    async fn update(&self, plan: &Plan) -> Result<()> {
        put(&self.plans, plan.id, plan, AppError::PlanNotFound)
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        remove(&self.plans, id, AppError::PlanNotFound)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryRepository {
    async fn create(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
    async fn get_by_id(&self, id: Uuid) -> Result<Subscription> {
        find(&self.subscriptions, id, AppError::SubscriptionNotFound)
    }
    async fn get_active_by_user_id(&self, user_id: Uuid) -> Result<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                s.user_id == user_id && s.is_active && s.status == SubscriptionStatus::Active
            })
            .max_by_key(|s| s.end_date)
            .cloned()
            .ok_or(AppError::SubscriptionNotFound)
    }
    async fn history_by_user_id(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let mut items = self.subscriptions_of(user_id);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
    async fn update(&self, subscription: &Subscription) -> Result<()> {
        put(
            &self.subscriptions,
            subscription.id,
            subscription,
            AppError::SubscriptionNotFound,
        )
    }
    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut map = self.subscriptions.lock().unwrap();
        let subscription = map.get_mut(&id).ok_or(AppError::SubscriptionNotFound)?;
        subscription.is_active = false;
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn create(&self, content: &Content) -> Result<()> {
        self.contents
            .lock()
            .unwrap()
            .insert(content.id, content.clone());
        Ok(())
    }
    async fn get_by_id(&self, id: Uuid) -> Result<Content> {
        find(&self.contents, id, AppError::ContentNotFound)
    }
    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<(Vec<Content>, i64)> {
        let mut items: Vec<Content> = self
            .contents
            .lock()
            .unwrap()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = items.len() as i64;
        Ok((paginate(items, page), total))
    }
    async fn update(&self, content: &Content) -> Result<()> {
        put(&self.contents, content.id, content, AppError::ContentNotFound)
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        remove(&self.contents, id, AppError::ContentNotFound)
    }
}

#[async_trait]
impl WatchHistoryRepository for MemoryRepository {
    async fn create(&self, history: &WatchHistory) -> Result<()> {
        let mut map = self.histories.lock().unwrap();
        if map
            .values()
            .any(|h| h.user_id == history.user_id && h.content_id == history.content_id)
        {
            return Err(AppError::Internal("duplicate watch history".to_string()));
        }
        map.insert(history.id, history.clone());
        Ok(())
    }
    async fn get_by_id(&self, id: Uuid) -> Result<WatchHistory> {
        find(&self.histories, id, AppError::WatchHistoryNotFound)
    }
    async fn get_by_user_and_content(
        &self,
        user_id: Uuid,
        content_id: Uuid,
    ) -> Result<WatchHistory> {
        self.histories
            .lock()
            .unwrap()
            .values()
            .find(|h| h.user_id == user_id && h.content_id == content_id)
            .cloned()
            .ok_or(AppError::WatchHistoryNotFound)
    }
    async fn get_by_user_id(&self, user_id: Uuid, page: Page) -> Result<(Vec<WatchHistory>, i64)> {
        let mut items: Vec<WatchHistory> = self
            .histories
            .lock()
            .unwrap()
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        let total = items.len() as i64;
        Ok((paginate(items, page), total))
    }
    async fn get_continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchHistory>> {
        let mut items: Vec<WatchHistory> = self
            .histories
            .lock()
            .unwrap()
            .values()
            .filter(|h| {
                h.user_id == user_id && h.status != WatchStatus::Completed && h.watched_seconds > 0
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        items.truncate(limit as usize);
        Ok(items)
    }
    async fn update(&self, history: &WatchHistory) -> Result<()> {
        put(&self.histories, history.id, history, AppError::WatchHistoryNotFound)
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        remove(&self.histories, id, AppError::WatchHistoryNotFound)
    }
}

pub fn repositories(repo: &Arc<MemoryRepository>) -> Repositories {
    Repositories {
        users: repo.clone(),
        plans: repo.clone(),
        subscriptions: repo.clone(),
        contents: repo.clone(),
        watch_history: repo.clone(),
    }
}

/// In-memory world with a controllable clock.
pub struct Fixture {
    pub repo: Arc<MemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub resolver: EntitlementResolver,
    pub tracker: WatchProgressTracker,
}

impl Fixture {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let clock = ManualClock::at(Utc::now());
        let resolver = EntitlementResolver::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo.clone(),
            clock.clone(),
        );
        let tracker =
            WatchProgressTracker::new(repo.clone(), repo.clone(), resolver.clone(), clock.clone());
        Self {
            repo,
            clock,
            resolver,
            tracker,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn user(&self) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            name: "Viewer".to_string(),
            bio: String::new(),
            picture: String::new(),
            phone: String::new(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        UserRepository::create(self.repo.as_ref(), &user).await.unwrap();
        user
    }

    pub async fn plan(&self, level: AccessLevel, validity_days: i32) -> Plan {
        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4(),
            name: format!("{:?}-{}", level, Uuid::new_v4()),
            price: 999,
            validity_days,
            access_level: level,
            max_devices_allowed: 2,
            resolution: "1080p".to_string(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        PlanRepository::create(self.repo.as_ref(), &plan).await.unwrap();
        plan
    }

    pub async fn content(
        &self,
        level: AccessLevel,
        duration_seconds: i32,
        published: bool,
    ) -> Content {
        let now = Utc::now();
        let content = Content {
            id: Uuid::new_v4(),
            title: "Feature".to_string(),
            description: String::new(),
            access_level: level,
            duration_seconds,
            thumbnail_url: String::new(),
            video_url: "https://cdn.example.com/feature.m3u8".to_string(),
            published,
            created_at: now,
            updated_at: now,
        };
        ContentRepository::create(self.repo.as_ref(), &content)
            .await
            .unwrap();
        content
    }

    /// A user holding a fresh subscription at `level`.
    pub async fn subscriber(&self, level: AccessLevel) -> (User, Subscription) {
        let user = self.user().await;
        let plan = self.plan(level, 30).await;
        let subscription = self
            .resolver
            .create_subscription(user.id, plan.id)
            .await
            .unwrap();
        (user, subscription)
    }
}
