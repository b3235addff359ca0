mod common;

use chrono::Duration;
use common::Fixture;
use streamgate::error::AppError;
use streamgate::models::{AccessLevel, Page, WatchStatus};
use uuid::Uuid;

#[tokio::test]
async fn first_report_creates_the_record() {
    let fx = Fixture::new();
    let user = fx.user().await;
    let content = fx.content(AccessLevel::Free, 1000, true).await;

    let started = fx.tracker.record_progress(user.id, content.id, 0).await.unwrap();
    assert_eq!(started.status, WatchStatus::Started);
    assert_eq!(started.total_seconds, 1000);

    let paused = fx.tracker.record_progress(user.id, content.id, 120).await.unwrap();
    assert_eq!(paused.id, started.id);
    assert_eq!(paused.status, WatchStatus::Paused);
}

#[tokio::test]
async fn completion_starts_at_ninety_percent() {
    let fx = Fixture::new();
    let user = fx.user().await;
    let content = fx.content(AccessLevel::Free, 1000, true).await;

    let below = fx.tracker.record_progress(user.id, content.id, 899).await.unwrap();
    assert_eq!(below.status, WatchStatus::Paused);
    assert!(!below.is_completed());

    let at = fx.tracker.record_progress(user.id, content.id, 900).await.unwrap();
    assert_eq!(at.status, WatchStatus::Completed);
    assert!((at.progress_percentage() - 90.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn later_lower_report_wins() {
    let fx = Fixture::new();
    let user = fx.user().await;
    let content = fx.content(AccessLevel::Free, 1000, true).await;

    fx.tracker.record_progress(user.id, content.id, 950).await.unwrap();
    let rewound = fx.tracker.record_progress(user.id, content.id, 100).await.unwrap();
    assert_eq!(rewound.watched_seconds, 100);
    assert_eq!(rewound.status, WatchStatus::Paused);

    let (items, total) = fx.tracker.history(user.id, Page::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].watched_seconds, 100);
}

#[tokio::test]
async fn zero_length_content_never_completes() {
    let fx = Fixture::new();
    let user = fx.user().await;
    let content = fx.content(AccessLevel::Free, 0, true).await;

    let history = fx.tracker.record_progress(user.id, content.id, 50).await.unwrap();
    assert_eq!(history.status, WatchStatus::Paused);
    assert_eq!(history.progress_percentage(), 0.0);
}

#[tokio::test]
async fn reporting_on_locked_content_is_refused() {
    let fx = Fixture::new();
    let content = fx.content(AccessLevel::Premium, 7200, true).await;
    let (basic, _) = fx.subscriber(AccessLevel::Basic).await;
    let (premium, _) = fx.subscriber(AccessLevel::Premium).await;

    assert!(matches!(
        fx.tracker.record_progress(basic.id, content.id, 60).await,
        Err(AppError::NotAccessible)
    ));
    assert!(fx.tracker.record_progress(premium.id, content.id, 60).await.is_ok());

    fx.clock.advance(Duration::days(31));
    assert!(matches!(
        fx.tracker.record_progress(premium.id, content.id, 120).await,
        Err(AppError::NotAccessible)
    ));
}

#[tokio::test]
async fn bad_reports_are_rejected() {
    let fx = Fixture::new();
    let user = fx.user().await;
    let content = fx.content(AccessLevel::Free, 1000, true).await;

    assert!(matches!(
        fx.tracker.record_progress(user.id, content.id, -1).await,
        Err(AppError::ValidationFailed(_))
    ));
    assert!(matches!(
        fx.tracker.record_progress(user.id, Uuid::new_v4(), 10).await,
        Err(AppError::ContentNotFound)
    ));
}

#[tokio::test]
async fn update_is_owner_only_and_has_no_started_state() {
    let fx = Fixture::new();
    let owner = fx.user().await;
    let stranger = fx.user().await;
    let content = fx.content(AccessLevel::Free, 1000, true).await;
    let history = fx.tracker.record_progress(owner.id, content.id, 300).await.unwrap();

    assert!(matches!(
        fx.tracker.update_progress(stranger.id, history.id, 10).await,
        Err(AppError::Forbidden)
    ));

    let updated = fx.tracker.update_progress(owner.id, history.id, 0).await.unwrap();
    assert_eq!(updated.status, WatchStatus::Paused);

    let finished = fx.tracker.update_progress(owner.id, history.id, 1000).await.unwrap();
    assert_eq!(finished.status, WatchStatus::Completed);

    assert!(matches!(
        fx.tracker.update_progress(owner.id, Uuid::new_v4(), 10).await,
        Err(AppError::WatchHistoryNotFound)
    ));
}

#[tokio::test]
async fn continue_watching_skips_finished_and_unstarted() {
    let fx = Fixture::new();
    let user = fx.user().await;

    let unstarted = fx.content(AccessLevel::Free, 1000, true).await;
    let finished = fx.content(AccessLevel::Free, 1000, true).await;
    let older = fx.content(AccessLevel::Free, 1000, true).await;
    let newer = fx.content(AccessLevel::Free, 1000, true).await;

    fx.tracker.record_progress(user.id, unstarted.id, 0).await.unwrap();
    fx.tracker.record_progress(user.id, finished.id, 990).await.unwrap();
    fx.tracker.record_progress(user.id, older.id, 100).await.unwrap();
    fx.clock.advance(Duration::minutes(5));
    fx.tracker.record_progress(user.id, newer.id, 200).await.unwrap();

    let items = fx.tracker.continue_watching(user.id).await.unwrap();
    let ids: Vec<Uuid> = items.iter().map(|h| h.content_id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn history_is_paged() {
    let fx = Fixture::new();
    let user = fx.user().await;
    for _ in 0..3 {
        let content = fx.content(AccessLevel::Free, 1000, true).await;
        fx.tracker.record_progress(user.id, content.id, 10).await.unwrap();
        fx.clock.advance(Duration::seconds(1));
    }

    let (items, total) = fx
        .tracker
        .history(user.id, Page { limit: 2, offset: 2 })
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 1);
}
