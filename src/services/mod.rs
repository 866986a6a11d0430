//! Business logic services

pub mod accounts;
pub mod catalog;
pub mod clock;
pub mod loans;
pub mod overdue;
pub mod recommendations;
pub mod scanner;
pub mod sms;
pub mod sweep;
pub mod templates;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    repository::Repository,
};
use clock::{Clock, SystemClock};
use sms::{NotificationQueue, RelayTransport, RetryPolicy, SmsDispatcher, TwilioTransport};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub accounts: accounts::AccountsService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub sweep: sweep::OverdueSweep,
    pub recommendations: recommendations::RecommendationService,
    pub scanner: scanner::ScannerService,
    pub sms: SmsDispatcher,
    pub queue: Arc<NotificationQueue>,
}

impl Services {
    /// Create all services with the given repository, talking to the SMS
    /// provider configured in `config`
    pub async fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let client = sms::transport::http_client(&config.sms)
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let relay = Arc::new(RelayTransport::new(client.clone(), config.sms.relay_url.clone()));
        let direct = Arc::new(TwilioTransport::new(client, &config.sms));
        let dispatcher = SmsDispatcher::new(relay, direct, &config.sms);

        Ok(Self::with_parts(
            repository,
            config,
            dispatcher,
            Arc::new(SystemClock),
        ))
    }

    /// Wire the services around an existing dispatcher and clock
    pub fn with_parts(
        repository: Repository,
        config: &AppConfig,
        dispatcher: SmsDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = Arc::new(NotificationQueue::new(
            dispatcher.clone(),
            config.sms.queue_capacity,
            RetryPolicy::from(&config.sms),
        ));

        let catalog = catalog::CatalogService::new(repository.clone());
        let loans = loans::LoansService::new(
            repository.clone(),
            catalog.clone(),
            queue.clone(),
            clock.clone(),
        );

        Self {
            accounts: accounts::AccountsService::new(
                repository.clone(),
                loans.clone(),
                queue.clone(),
                clock.clone(),
                &config.sms,
            ),
            sweep: sweep::OverdueSweep::new(repository.clone(), queue.clone(), clock),
            recommendations: recommendations::RecommendationService::new(
                repository.clone(),
                catalog.clone(),
            ),
            scanner: scanner::ScannerService::new(
                config.scanner.clone(),
                repository.clone(),
                catalog.clone(),
            ),
            catalog,
            loans,
            sms: dispatcher,
            queue,
            repository,
        }
    }
}
