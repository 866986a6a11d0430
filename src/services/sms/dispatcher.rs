//! Notification dispatcher: relay first, direct provider call second,
//! local log last

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    phone::{is_valid_e164, normalize_phone_number, resolve_recipient},
    transport::{SmsError, SmsReceipt, SmsTransport},
};
use crate::{
    config::SmsConfig,
    models::notification::{
        DeliveryChannel, DeliveryStatus, RelayFailure, RelaySuccess, SmsRecord,
    },
};

/// Delivery log shared by every clone of the dispatcher
#[derive(Clone, Default)]
pub struct MessageLog {
    records: Arc<RwLock<Vec<SmsRecord>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn append(&self, record: SmsRecord) {
        self.records.write().await.push(record);
    }

    /// All attempts, newest first
    pub async fn newest_first(&self) -> Vec<SmsRecord> {
        self.records.read().await.iter().rev().cloned().collect()
    }
}

/// Result of trying every transport once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        channel: DeliveryChannel,
        receipt: SmsReceipt,
    },
    Undelivered {
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Server side of the relay endpoint
#[derive(Debug, Clone)]
pub enum RelayOutcome {
    Sent(RelaySuccess),
    /// Request was missing a phone number or message
    Rejected(RelayFailure),
    /// Provider call failed
    Failed(RelayFailure),
}

#[derive(Clone)]
pub struct SmsDispatcher {
    primary: Arc<dyn SmsTransport>,
    fallback: Arc<dyn SmsTransport>,
    log: MessageLog,
    country_code: String,
    demo_number: String,
}

impl SmsDispatcher {
    pub fn new(
        primary: Arc<dyn SmsTransport>,
        fallback: Arc<dyn SmsTransport>,
        config: &SmsConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            log: MessageLog::new(),
            country_code: config.default_country_code.clone(),
            demo_number: config.demo_number.clone(),
        }
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Try the primary transport, then the fallback. Every attempt is logged.
    pub async fn deliver(&self, phone: &str, message: &str) -> DeliveryOutcome {
        let to = resolve_recipient(phone, &self.country_code, &self.demo_number);

        let mut reasons = Vec::with_capacity(2);
        for transport in [&self.primary, &self.fallback] {
            match self.attempt(transport.as_ref(), &to, message).await {
                Ok(receipt) => {
                    return DeliveryOutcome::Delivered {
                        channel: transport.channel(),
                        receipt,
                    }
                }
                Err(e) => reasons.push(e.to_string()),
            }
        }

        DeliveryOutcome::Undelivered {
            reason: reasons.join("; "),
        }
    }

    async fn attempt(
        &self,
        transport: &dyn SmsTransport,
        to: &str,
        message: &str,
    ) -> Result<SmsReceipt, SmsError> {
        let channel = transport.channel();
        let result = transport.send(to, message).await;

        let (status, message_id) = match &result {
            Ok(receipt) if receipt.status.eq_ignore_ascii_case("delivered") => {
                (DeliveryStatus::Delivered, Some(receipt.message_id.clone()))
            }
            Ok(receipt) => (DeliveryStatus::Sent, Some(receipt.message_id.clone())),
            Err(e) => {
                tracing::warn!("SMS via {:?} to {} failed: {}", channel, to, e);
                (DeliveryStatus::Failed, None)
            }
        };

        self.log
            .append(SmsRecord {
                to: to.to_string(),
                message: message.to_string(),
                timestamp: Utc::now(),
                status,
                channel,
                message_id,
            })
            .await;

        result
    }

    /// Best-effort send. Never fails the caller: when no transport accepts
    /// the message it is written to the local log instead.
    pub async fn send(&self, phone: &str, message: &str) -> bool {
        match self.deliver(phone, message).await {
            DeliveryOutcome::Delivered { channel, receipt } => {
                tracing::info!(
                    "SMS to {} sent via {:?} ({})",
                    phone,
                    channel,
                    receipt.message_id
                );
            }
            DeliveryOutcome::Undelivered { reason } => {
                log_locally(phone, message, &reason);
            }
        }
        true
    }

    pub async fn history(&self) -> Vec<SmsRecord> {
        self.log.newest_first().await
    }

    /// Handle a relay request by calling the provider directly
    pub async fn relay(&self, raw_phone: &str, message: &str) -> RelayOutcome {
        if raw_phone.trim().is_empty() || message.trim().is_empty() {
            return RelayOutcome::Rejected(RelayFailure {
                error: "Phone number and message are required".to_string(),
                details: String::new(),
                to: None,
                original_number: None,
            });
        }

        let mut to = normalize_phone_number(raw_phone, &self.country_code);
        if !is_valid_e164(&to) {
            tracing::warn!(
                "Invalid phone number format: {}, using demo number {}",
                raw_phone,
                self.demo_number
            );
            to = self.demo_number.clone();
        }

        match self.attempt(self.fallback.as_ref(), &to, message).await {
            Ok(receipt) => RelayOutcome::Sent(RelaySuccess {
                success: true,
                message_id: receipt.message_id,
                status: receipt.status,
                to,
                original_number: raw_phone.to_string(),
            }),
            Err(e) => {
                let details = match e {
                    SmsError::Provider { details, .. } => details,
                    other => other.to_string(),
                };
                RelayOutcome::Failed(RelayFailure {
                    error: "Failed to send SMS".to_string(),
                    details,
                    to: Some(to),
                    original_number: Some(raw_phone.to_string()),
                })
            }
        }
    }
}

/// Last-resort path when every transport failed
pub fn log_locally(phone: &str, message: &str, reason: &str) {
    tracing::info!(
        target: "libris_server::sms::local",
        phone,
        reason,
        "SMS (local fallback): {}",
        message
    );
}
