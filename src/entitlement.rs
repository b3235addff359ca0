// src/entitlement.rs
//! Subscription lifecycle and content entitlement.
//!
//! ```text
//! active --(now > end_date, observed on read)--> expired
//! active --(owner cancels)--------------------> cancelled
//! active --(renew)--> new active, old cancelled
//! ```
//!
//! Expiry is lazy: nothing sweeps. The first read that sees a lapsed subscription
//! writes the transition back and reports it.
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::{
    AccessLevel, Content, ContentFilter, Page, Plan, Subscription, SubscriptionStatus,
};
use crate::repository::{
    ContentRepository, PlanRepository, SubscriptionRepository, UserRepository,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct EntitlementResolver {
    users: Arc<dyn UserRepository>,
    plans: Arc<dyn PlanRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    contents: Arc<dyn ContentRepository>,
    clock: Arc<dyn Clock>,
}

impl EntitlementResolver {
    pub fn new(
        users: Arc<dyn UserRepository>,
        plans: Arc<dyn PlanRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        contents: Arc<dyn ContentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            plans,
            subscriptions,
            contents,
            clock,
        }
    }

    /// The user's live subscription. A lapsed one is persisted as expired before
    /// `SubscriptionExpired` is returned.
    pub async fn get_active_subscription(&self, user_id: Uuid) -> Result<Subscription> {
        let mut subscription = self.subscriptions.get_active_by_user_id(user_id).await?;
        let now = self.clock.now();
        if subscription.effective_status(now) == SubscriptionStatus::Expired {
            subscription.mark_expired(now);
            if let Err(e) = self.subscriptions.update(&subscription).await {
                // the next read retries the transition
                tracing::warn!(
                    "Failed to persist expiry of subscription {}: {}",
                    subscription.id,
                    e
                );
            } else {
                tracing::info!("Subscription {} expired for user {}", subscription.id, user_id);
            }
            return Err(AppError::SubscriptionExpired);
        }
        Ok(subscription)
    }

    /// Same as `get_active_subscription`, with "none" and "expired" folded into `None`.
    async fn live_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        match self.get_active_subscription(user_id).await {
            Ok(subscription) => Ok(Some(subscription)),
            Err(AppError::SubscriptionNotFound | AppError::SubscriptionExpired) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn can_access(&self, user_id: Option<Uuid>, required: AccessLevel) -> Result<bool> {
        if required == AccessLevel::Free {
            return Ok(true);
        }
        let Some(user_id) = user_id else {
            return Ok(false);
        };
        let Some(subscription) = self.live_subscription(user_id).await? else {
            return Ok(false);
        };
        match self.plans.get_by_id(subscription.plan_id).await {
            Ok(plan) => Ok(plan.access_level.unlocks(required)),
            Err(AppError::PlanNotFound) => {
                tracing::warn!(
                    "Subscription {} references missing plan {}",
                    subscription.id,
                    subscription.plan_id
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_content(&self, content_id: Uuid, user_id: Option<Uuid>) -> Result<Content> {
        let content = self.contents.get_by_id(content_id).await?;
        if !content.published {
            return Err(AppError::NotPublished);
        }
        if !self.can_access(user_id, content.access_level).await? {
            tracing::warn!("Access to content {} denied for {:?}", content_id, user_id);
            return Err(AppError::NotAccessible);
        }
        Ok(content)
    }

    /// Published catalog page. Listing does not gate on entitlement; reads do.
    pub async fn list_content(
        &self,
        access_level: Option<AccessLevel>,
        page: Page,
    ) -> Result<(Vec<Content>, i64)> {
        let filter = ContentFilter {
            access_level,
            ..ContentFilter::published_only()
        };
        self.contents.list(&filter, page.normalized()).await
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>> {
        self.plans.list(true).await
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Plan> {
        self.plans.get_by_id(plan_id).await
    }

    pub async fn create_subscription(&self, user_id: Uuid, plan_id: Uuid) -> Result<Subscription> {
        self.users.get_by_id(user_id).await?;
        if self.live_subscription(user_id).await?.is_some() {
            return Err(AppError::ActiveSubscriptionExists);
        }
        let plan = self.plans.get_by_id(plan_id).await?;
        if !plan.is_active {
            return Err(AppError::PlanNotAvailable);
        }

        let subscription = Subscription::start(user_id, &plan, self.clock.now());
        self.subscriptions.create(&subscription).await?;
        tracing::info!(
            "User {} subscribed to plan {} until {}",
            user_id,
            plan.name,
            subscription.end_date
        );
        Ok(subscription)
    }

    pub async fn subscription_history(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        self.subscriptions.history_by_user_id(user_id).await
    }

    pub async fn cancel_subscription(&self, user_id: Uuid, subscription_id: Uuid) -> Result<()> {
        let subscription = self.subscriptions.get_by_id(subscription_id).await?;
        if subscription.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        if !subscription.is_active {
            return Err(AppError::SubscriptionInactive);
        }
        self.subscriptions
            .cancel(subscription_id, self.clock.now())
            .await?;
        tracing::info!("Subscription {} cancelled by user {}", subscription_id, user_id);
        Ok(())
    }

    /// Starts a new subscription on the same plan and cancels the old one.
    pub async fn renew_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Subscription> {
        let old = self.subscriptions.get_by_id(subscription_id).await?;
        if old.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        // renewing a stale record must not leave two live subscriptions
        if let Some(live) = self.live_subscription(user_id).await? {
            if live.id != old.id {
                return Err(AppError::ActiveSubscriptionExists);
            }
        }
        let plan = self.plans.get_by_id(old.plan_id).await?;
        if !plan.is_active {
            return Err(AppError::PlanNotAvailable);
        }

        let renewed = Subscription::start(user_id, &plan, self.clock.now());
        self.subscriptions.create(&renewed).await?;
        if let Err(e) = self.subscriptions.cancel(old.id, self.clock.now()).await {
            tracing::error!(
                "Renewal {} created but cancelling {} failed: {}",
                renewed.id,
                old.id,
                e
            );
            return Err(e);
        }
        tracing::info!("Subscription {} renewed as {}", old.id, renewed.id);
        Ok(renewed)
    }
}
