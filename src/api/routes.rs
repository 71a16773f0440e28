// src/api/routes.rs
use actix_web::{HttpResponse, error, web};
use super::handlers;
use crate::models::VerificationResult;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .route("/health", web::get().to(handlers::health_check))
            .route("/test", web::post().to(handlers::run_test))
            .route("/test/latest", web::get().to(handlers::latest_result))
            .route("/preview", web::post().to(handlers::preview_request))
            .route("/self-test", web::post().to(handlers::run_self_test))
    );
}

/// Malformed bodies get the same `{success: false, error}` shape as failed
/// verifications.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {}", err);
        log::warn!("{}", message);
        let response = HttpResponse::BadRequest().json(VerificationResult::failure(message));
        error::InternalError::from_response(err, response).into()
    })
}
