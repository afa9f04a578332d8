use std::sync::Arc;
use std::time::Instant;

use crate::channel::{create_channel_resolver, ChannelResolver};
use crate::config::Settings;
use crate::dispatch::DispatchOrchestrator;
use crate::error::AppError;
use crate::quota::QuotaAccountant;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub dispatcher: Arc<DispatchOrchestrator>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the channel registry, accountant and dispatcher from settings.
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let resolver = Arc::new(create_channel_resolver(&settings.channels)?);
        let accountant = Arc::new(QuotaAccountant::new(settings.quota.clone()));
        Ok(Self::with_components(settings, resolver, accountant))
    }

    /// Assemble state around an existing resolver and accountant
    pub fn with_components(
        settings: Settings,
        resolver: Arc<ChannelResolver>,
        accountant: Arc<QuotaAccountant>,
    ) -> Self {
        let dispatcher = Arc::new(DispatchOrchestrator::with_config(
            resolver,
            accountant,
            settings.dispatch.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            dispatcher,
            start_time: Instant::now(),
        }
    }
}
