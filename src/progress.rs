// src/progress.rs
//! Watch progress per (user, content) pair.
//!
//! Reports are last-write-wins: a lower `watched_seconds` replaces a higher one, and
//! two concurrent reports for the same pair race at the repository without any
//! serialization here. The first report for a pair creates the record; if two first
//! reports race, the loser gets the repository's uniqueness error.
use crate::clock::Clock;
use crate::entitlement::EntitlementResolver;
use crate::error::{AppError, Result};
use crate::models::{AccessLevel, Page, WatchHistory, WatchStatus};
use crate::repository::{ContentRepository, WatchHistoryRepository};
use std::sync::Arc;
use uuid::Uuid;

const CONTINUE_WATCHING_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct WatchProgressTracker {
    histories: Arc<dyn WatchHistoryRepository>,
    contents: Arc<dyn ContentRepository>,
    resolver: EntitlementResolver,
    clock: Arc<dyn Clock>,
}

fn validate_seconds(watched_seconds: i32) -> Result<()> {
    if watched_seconds < 0 {
        return Err(AppError::ValidationFailed(
            "watched_seconds must not be negative".to_string(),
        ));
    }
    Ok(())
}

impl WatchProgressTracker {
    pub fn new(
        histories: Arc<dyn WatchHistoryRepository>,
        contents: Arc<dyn ContentRepository>,
        resolver: EntitlementResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            histories,
            contents,
            resolver,
            clock,
        }
    }

    pub async fn record_progress(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        watched_seconds: i32,
    ) -> Result<WatchHistory> {
        validate_seconds(watched_seconds)?;
        let content = self.contents.get_by_id(content_id).await?;
        if content.access_level != AccessLevel::Free
            && !self
                .resolver
                .can_access(Some(user_id), content.access_level)
                .await?
        {
            return Err(AppError::NotAccessible);
        }

        let now = self.clock.now();
        match self
            .histories
            .get_by_user_and_content(user_id, content_id)
            .await
        {
            Ok(mut history) => {
                history.watched_seconds = watched_seconds;
                history.status = WatchStatus::for_report(watched_seconds, history.total_seconds);
                history.last_watched_at = now;
                history.updated_at = now;
                self.histories.update(&history).await?;
                Ok(history)
            }
            Err(AppError::WatchHistoryNotFound) => {
                let history = WatchHistory {
                    id: Uuid::new_v4(),
                    user_id,
                    content_id,
                    watched_seconds,
                    total_seconds: content.duration_seconds,
                    status: WatchStatus::for_report(watched_seconds, content.duration_seconds),
                    last_watched_at: now,
                    created_at: now,
                    updated_at: now,
                };
                self.histories.create(&history).await?;
                tracing::debug!("Started watch history {} for user {}", history.id, user_id);
                Ok(history)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_progress(
        &self,
        user_id: Uuid,
        history_id: Uuid,
        watched_seconds: i32,
    ) -> Result<WatchHistory> {
        validate_seconds(watched_seconds)?;
        let mut history = self.histories.get_by_id(history_id).await?;
        if history.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        let now = self.clock.now();
        history.watched_seconds = watched_seconds;
        history.status = WatchStatus::for_update(watched_seconds, history.total_seconds);
        history.last_watched_at = now;
        history.updated_at = now;
        self.histories.update(&history).await?;
        Ok(history)
    }

    pub async fn history(&self, user_id: Uuid, page: Page) -> Result<(Vec<WatchHistory>, i64)> {
        self.histories
            .get_by_user_id(user_id, page.normalized())
            .await
    }

    pub async fn continue_watching(&self, user_id: Uuid) -> Result<Vec<WatchHistory>> {
        self.histories
            .get_continue_watching(user_id, CONTINUE_WATCHING_LIMIT)
            .await
    }
}
