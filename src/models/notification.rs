//! SMS delivery records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Failed,
}

/// Path a message took towards the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Relay,
    Direct,
}

/// One delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SmsRecord {
    pub to: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub channel: DeliveryChannel,
    pub message_id: Option<String>,
}

/// Message the queue gave up on
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeadLetter {
    pub id: Uuid,
    pub to: String,
    pub message: String,
    pub attempts: u32,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Body accepted by the SMS relay endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
}

/// Successful relay response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelaySuccess {
    pub success: bool,
    pub message_id: String,
    pub status: String,
    pub to: String,
    pub original_number: String,
}

/// Failed relay response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelayFailure {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_number: Option<String>,
}
