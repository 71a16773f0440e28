// src/runner.rs
use std::time::Instant;

use crate::errors::Result;
use crate::expression::{self, Expression};
use crate::fetcher::JsonFetcher;
use crate::models::{StatusLabel, VerificationRequest, VerificationResult};
use crate::request_builder;

/// Runs one verification: build the request, fetch the response, evaluate
/// the expression against it.
///
/// Transport and JSON failures are returned as errors. Expression failures
/// are not: they produce a successful result with `isValid: 0` and the
/// message in `evaluationError`.
pub async fn run_verification<F: JsonFetcher>(
    fetcher: &F,
    request: &VerificationRequest,
    max_expression_len: usize,
) -> Result<VerificationResult> {
    let started = Instant::now();
    let built = request_builder::build(&request.api_url, &request.wallet_address, &request.auth);

    log::info!(
        "Verifying wallet {} against {} (auth: {})",
        request.wallet_address,
        request_builder::without_query(&request.api_url),
        request.auth.kind()
    );

    let fetched = fetcher.fetch_json(&built).await?;

    let outcome = Expression::compile_with_limit(&request.verification_expression, max_expression_len)
        .and_then(|compiled| compiled.evaluate(&fetched.body));
    let evaluation_error = match &outcome {
        Ok(_) => None,
        Err(e) => {
            log::warn!("Verification expression failed, treating as 0: {}", e);
            Some(e.to_string())
        }
    };

    let is_valid = expression::legacy_verdict(&outcome);
    let status = if expression::is_valid(&is_valid) {
        StatusLabel::Valid
    } else {
        StatusLabel::Invalid
    };

    log::info!(
        "Verdict {} for wallet {} ({}ms)",
        status,
        request.wallet_address,
        started.elapsed().as_millis()
    );

    Ok(VerificationResult {
        success: true,
        data: Some(fetched.body),
        is_valid,
        status: Some(status),
        error: None,
        evaluation_error,
        upstream_status: Some(fetched.status),
        latency_ms: Some(fetched.latency_ms),
        checked_at: Some(chrono::Utc::now().to_rfc3339()),
        url: Some(built.url),
        sequence: None,
    })
}

/// Like [`run_verification`], but folds transport errors into the
/// `{success: false, error}` shape.
pub async fn check<F: JsonFetcher>(
    fetcher: &F,
    request: &VerificationRequest,
    max_expression_len: usize,
) -> VerificationResult {
    match run_verification(fetcher, request, max_expression_len).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(
                "Verification request to {} failed: {}",
                request_builder::without_query(&request.api_url),
                e
            );
            VerificationResult::failure(e.to_string())
        }
    }
}
