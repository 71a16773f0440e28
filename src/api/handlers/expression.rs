// src/api/handlers/expression.rs
use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use crate::api::AppState;
use crate::self_test::{self_test_with, SampleCase};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfTestRequest {
    pub verification_expression: String,
    /// Replaces the canned cases when non-empty.
    #[serde(default)]
    pub cases: Vec<SampleCase>,
}

pub async fn run_self_test(
    state: web::Data<AppState>,
    req: web::Json<SelfTestRequest>,
) -> Result<HttpResponse> {
    let report = self_test_with(&req.verification_expression, &req.cases, state.config.max_expression_len);
    Ok(HttpResponse::Ok().json(report))
}
