use actix_web::{App, HttpServer, web};
use common::ServiceError;
use common::config::SubmissionConfig;
use common::logger::{create_child_logger, init_root_logger};
use common::submission::routes::{SubmissionState, configure};
use common::submission::store::SubmissionStore;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SubmissionConfig::new()?;
    let root_logger = init_root_logger();

    // Startup fails when the upload directory cannot be created.
    if let Err(e) = SubmissionStore::ensure_upload_dir(Path::new(&config.upload_dir)) {
        error!("{}", e);
        return Err(e);
    }

    let bind_address = config.bind_address.clone();
    let state = web::Data::new(SubmissionState::new(
        config,
        create_child_logger(&root_logger, "submission_service"),
    ));

    info!("Submission portal listening on {}", bind_address);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(&bind_address)?
        .run()
        .await?;

    Ok(())
}
