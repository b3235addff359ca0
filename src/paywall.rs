// src/paywall.rs
use crate::AppState;
use crate::error::Result;
use crate::extract::{AuthUser, MaybeUser};
use crate::models::{
    AccessLevel, CreateSubscriptionRequest, Page, Paginated, UpdateProgressRequest,
    WatchProgressRequest,
};
use actix_web::{HttpResponse, get, post, put, web};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
    cfg.service(list_content);
    cfg.service(get_content);
    cfg.service(list_plans);
    cfg.service(get_plan);
    cfg.service(create_subscription);
    cfg.service(get_active_subscription);
    cfg.service(subscription_history);
    cfg.service(cancel_subscription);
    cfg.service(renew_subscription);
    cfg.service(record_progress);
    cfg.service(continue_watching);
    cfg.service(watch_history);
    cfg.service(update_progress);
}

#[derive(Deserialize)]
pub struct ContentQuery {
    access_level: Option<AccessLevel>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl ContentQuery {
    fn page(&self) -> Page {
        let default = Page::default();
        Page {
            limit: self.limit.unwrap_or(default.limit),
            offset: self.offset.unwrap_or(default.offset),
        }
        .normalized()
    }
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

#[get("/content")]
pub async fn list_content(
    state: web::Data<AppState>,
    _caller: MaybeUser,
    query: web::Query<ContentQuery>,
) -> Result<HttpResponse> {
    let page = query.page();
    let (items, total) = state
        .resolver
        .list_content(query.access_level, page)
        .await?;
    Ok(HttpResponse::Ok().json(Paginated {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[get("/content/{content_id}")]
pub async fn get_content(
    state: web::Data<AppState>,
    caller: MaybeUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let content = state
        .resolver
        .get_content(path.into_inner(), caller.id())
        .await?;
    Ok(HttpResponse::Ok().json(content))
}

#[get("/plans")]
pub async fn list_plans(state: web::Data<AppState>, _caller: MaybeUser) -> Result<HttpResponse> {
    let plans = state.resolver.list_plans().await?;
    Ok(HttpResponse::Ok().json(plans))
}

#[get("/plans/{plan_id}")]
pub async fn get_plan(
    state: web::Data<AppState>,
    _caller: MaybeUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let plan = state.resolver.get_plan(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plan))
}

#[post("/subscriptions")]
pub async fn create_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let subscription = state
        .resolver
        .create_subscription(user.id(), req.plan_id)
        .await?;
    Ok(HttpResponse::Created().json(subscription))
}

#[get("/subscriptions/active")]
pub async fn get_active_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let subscription = state.resolver.get_active_subscription(user.id()).await?;
    Ok(HttpResponse::Ok().json(subscription))
}

#[get("/subscriptions/history")]
pub async fn subscription_history(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let history = state.resolver.subscription_history(user.id()).await?;
    Ok(HttpResponse::Ok().json(history))
}

#[post("/subscriptions/{subscription_id}/cancel")]
pub async fn cancel_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .resolver
        .cancel_subscription(user.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Subscription cancelled" })))
}

#[post("/subscriptions/{subscription_id}/renew")]
pub async fn renew_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let subscription = state
        .resolver
        .renew_subscription(user.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(subscription))
}

#[post("/watch-history")]
pub async fn record_progress(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<WatchProgressRequest>,
) -> Result<HttpResponse> {
    let history = state
        .progress
        .record_progress(user.id(), req.content_id, req.watched_seconds)
        .await?;
    Ok(HttpResponse::Ok().json(history))
}

#[get("/watch-history/continue-watching")]
pub async fn continue_watching(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let items = state.progress.continue_watching(user.id()).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[get("/watch-history")]
pub async fn watch_history(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<Page>,
) -> Result<HttpResponse> {
    let page = query.into_inner().normalized();
    let (items, total) = state.progress.history(user.id(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[put("/watch-history/{history_id}")]
pub async fn update_progress(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateProgressRequest>,
) -> Result<HttpResponse> {
    let history = state
        .progress
        .update_progress(user.id(), path.into_inner(), req.watched_seconds)
        .await?;
    Ok(HttpResponse::Ok().json(history))
}
