// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod errors;
pub mod expression;
pub mod fetcher;
pub mod models;
pub mod request_builder;
pub mod runner;
pub mod sequencer;
