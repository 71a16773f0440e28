// src/api/handlers/preview.rs
use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use crate::models::AuthConfig;
use crate::request_builder;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub api_url: String,
    pub wallet_address: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Shows the URL and headers a test would send, without sending anything.
pub async fn preview_request(req: web::Json<PreviewRequest>) -> Result<HttpResponse> {
    let built = request_builder::build(&req.api_url, &req.wallet_address, &req.auth);
    Ok(HttpResponse::Ok().json(built))
}
