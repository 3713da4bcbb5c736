// src/main.rs

use std::time::Duration;

use quizgenius::{
    config::Config,
    routes,
    state::AppState,
    utils::{hash::hash_password, jwt::Role},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_ATTEMPTS: u32 = 5;
const DB_RETRY_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let pool = connect_with_retry(&config.database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("migrations applied");

    if let Err(e) = seed_admin(&pool, &config).await {
        tracing::error!("admin seeding failed: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("QuizGenius listening on {}", listener.local_addr()?);

    let app = routes::create_router(AppState { pool, config });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Logs to stdout and to a daily rolling file under `logs/`.
/// The returned guard flushes the file writer on drop.
fn init_tracing(config: &Config) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "app.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await;

        match result {
            Ok(pool) => {
                tracing::info!(attempt, "database connected");
                return Ok(pool);
            }
            Err(e) if attempt < DB_CONNECT_ATTEMPTS => {
                tracing::warn!(attempt, "database not ready ({}), retrying", e);
                attempt += 1;
                tokio::time::sleep(DB_RETRY_DELAY).await;
            }
            Err(e) => {
                tracing::error!("giving up on the database after {} attempts", attempt);
                return Err(e);
            }
        }
    }
}

/// Creates the admin account named by `ADMIN_USERNAME` / `ADMIN_PASSWORD` if missing.
async fn seed_admin(pool: &PgPool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let password_hash = hash_password(password)?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(Role::Admin.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!(username = %username, "admin account created");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
