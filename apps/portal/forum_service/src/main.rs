use actix_web::{App, HttpServer, web};
use common::ServiceError;
use common::config::ForumConfig;
use common::forum::controller::ForumController;
use common::forum::routes::{ForumState, configure};
use common::forum::store::SeaOrmForumStore;
use common::session::SessionRegistry;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ForumConfig::new()?;
    let db = Database::connect(
        ConnectOptions::new(&config.database_url)
            .sqlx_logging(false)
            .to_owned(),
    )
    .await?;

    if config.run_migrations {
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations completed successfully");
    }

    let controller = ForumController::new(Arc::new(SeaOrmForumStore::new(db)));
    let sessions = SessionRegistry::with_limits(
        Duration::from_secs(config.session_idle_secs),
        config.max_sessions,
    );
    let state = web::Data::new(ForumState::with_sessions(controller, sessions));

    info!("Forum listening on {}", config.bind_address);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(&config.bind_address)?
        .run()
        .await?;

    Ok(())
}
