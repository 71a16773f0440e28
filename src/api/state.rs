// src/api/state.rs
use crate::config::AppConfig;
use crate::errors::Result;
use crate::fetcher::HttpFetcher;
use crate::sequencer::ResultSlot;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub fetcher: HttpFetcher,
    pub results: Arc<ResultSlot>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::with_timeout(config.request_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            results: Arc::new(ResultSlot::new()),
        })
    }
}
