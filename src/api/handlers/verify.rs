// src/api/handlers/verify.rs
use actix_web::{web, HttpResponse, Result};
use crate::api::AppState;
use crate::models::{VerificationRequest, VerificationResult};
use crate::runner;

/// Runs one verification and records it as the latest result, unless a
/// newer request was started while this one was in flight.
pub async fn run_test(
    state: web::Data<AppState>,
    req: web::Json<VerificationRequest>,
) -> Result<HttpResponse> {
    let request = req.into_inner();
    let ticket = state.results.issue();

    let mut result = runner::check(&state.fetcher, &request, state.config.max_expression_len).await;
    result.sequence = Some(ticket);

    if !state.results.commit(ticket, result.clone()).await {
        log::info!("Result #{} superseded by a newer request; not recorded as latest", ticket);
    }

    if result.success {
        Ok(HttpResponse::Ok().json(result))
    } else {
        Ok(HttpResponse::InternalServerError().json(result))
    }
}

pub async fn latest_result(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.results.latest().await {
        Some((_, result)) => Ok(HttpResponse::Ok().json(result)),
        None => Ok(HttpResponse::NotFound().json(VerificationResult::failure(
            "No verification has completed yet",
        ))),
    }
}
