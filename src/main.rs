// src/main.rs
use actix_web::{App, HttpServer, middleware::Logger, web};
use sqlx::PgPool;
use std::sync::Arc;
use streamgate::clock::SystemClock;
use streamgate::config::{Config, StoreBackend};
use streamgate::db::PgRepository;
use streamgate::store::{KeyValueStore, MemoryStore, RedisStore};
use streamgate::{AppState, Repositories};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    tracing::info!("Starting streamgate service");

    dotenv::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    let repo = PgRepository::new(pool);
    repo.migrate().await.expect("Failed to run migrations");

    let store: Arc<dyn KeyValueStore> = match config.store_backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis_url, config.store_timeout())
                .await
                .expect("Failed to connect to Redis"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-process session store; sessions are not shared across instances");
            Arc::new(MemoryStore::default())
        }
    };

    let state = web::Data::new(AppState::new(
        &config,
        Repositories::postgres(repo),
        store,
        Arc::new(SystemClock),
    ));

    let bind = (config.host.clone(), config.port);
    tracing::info!("Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(streamgate::configure)
    })
    .bind(bind)?
    .run()
    .await
}
