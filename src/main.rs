use actix_cors::Cors;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{web, App, HttpServer};
use midas_claims::application::ReimbursementUseCase;
use midas_claims::infrastructure::config::Settings;
use midas_claims::infrastructure::llm_clients::OpenAiClient;
use midas_claims::infrastructure::mailer::Mailer;
use midas_claims::infrastructure::storage::StorageClient;
use midas_claims::interfaces::http::{self, HttpState};
use std::sync::Arc;
use tracing::info;

const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().map_err(to_io_error)?;

    let llm_client = Arc::new(OpenAiClient::new(settings.llm.clone()).map_err(to_io_error)?);
    let storage = if settings.storage.enabled {
        Some(Arc::new(
            StorageClient::new(settings.storage.clone()).map_err(to_io_error)?,
        ))
    } else {
        None
    };
    let mailer = if settings.smtp.enabled {
        Some(Arc::new(
            Mailer::new(settings.smtp.clone()).map_err(to_io_error)?,
        ))
    } else {
        None
    };

    let use_case = Arc::new(ReimbursementUseCase::new(
        llm_client,
        storage,
        mailer,
        settings.staging_root.clone(),
    ));
    let state = web::Data::new(HttpState {
        reimbursement_use_case: use_case,
    });

    info!(
        host = %settings.host,
        port = settings.port,
        model = %settings.llm.model,
        storage = settings.storage.enabled,
        smtp = settings.smtp.enabled,
        "starting reimbursement service"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(UPLOAD_LIMIT_BYTES)
                    .memory_limit(UPLOAD_LIMIT_BYTES),
            )
            .configure(http::configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}

fn to_io_error(err: midas_claims::domain::error::AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}
