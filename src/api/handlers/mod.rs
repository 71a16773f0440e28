// src/api/handlers/mod.rs
mod expression;
mod health;
mod preview;
mod verify;

pub use expression::run_self_test;
pub use health::health_check;
pub use preview::preview_request;
pub use verify::{latest_result, run_test};
