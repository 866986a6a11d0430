//! Outbound SMS transports: the relay endpoint and the provider REST API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::SmsConfig,
    models::notification::{DeliveryChannel, RelayRequest},
};

/// Acknowledgement returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    pub message_id: String,
    /// Provider-reported status (`queued`, `sent`, `delivered`, ...)
    pub status: String,
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected message ({status}): {details}")]
    Provider { status: u16, details: String },

    #[error("Relay failed ({status}): {error}: {details}")]
    Relay {
        status: u16,
        error: String,
        details: String,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError>;

    fn channel(&self) -> DeliveryChannel;
}

/// Build the shared HTTP client
pub fn http_client(config: &SmsConfig) -> Result<reqwest::Client, SmsError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Posts `{phoneNumber, message}` to the relay endpoint
pub struct RelayTransport {
    client: reqwest::Client,
    url: String,
}

impl RelayTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    #[serde(default)]
    success: bool,
    message_id: Option<String>,
    status: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

#[async_trait]
impl SmsTransport for RelayTransport {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let request = RelayRequest {
            phone_number: to.to_string(),
            message: body.to_string(),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Rate limiting and proxies answer with plain text
        let Ok(result) = serde_json::from_str::<RelayResponse>(&text) else {
            return Err(SmsError::Relay {
                status: status.as_u16(),
                error: "Unexpected relay response".to_string(),
                details: text.trim().to_string(),
            });
        };

        if status.is_success() && result.success {
            Ok(SmsReceipt {
                message_id: result.message_id.unwrap_or_default(),
                status: result.status.unwrap_or_else(|| "sent".to_string()),
            })
        } else {
            Err(SmsError::Relay {
                status: status.as_u16(),
                error: result.error.unwrap_or_else(|| "Failed to send SMS".to_string()),
                details: result.details.unwrap_or_default(),
            })
        }
    }

    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Relay
    }
}

/// Calls the provider's Messages API directly with basic auth
pub struct TwilioTransport {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioTransport {
    pub fn new(client: reqwest::Client, config: &SmsConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[derive(Debug, Deserialize)]
struct ProviderMessage {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

#[async_trait]
impl SmsTransport for TwilioTransport {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let form = [("From", self.from_number.as_str()), ("To", to), ("Body", body)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let message: ProviderMessage = response.json().await?;
            tracing::debug!("Provider accepted message {} ({})", message.sid, message.status);
            Ok(SmsReceipt {
                message_id: message.sid,
                status: message.status,
            })
        } else {
            let details = response
                .json::<ProviderError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(SmsError::Provider {
                status: status.as_u16(),
                details,
            })
        }
    }

    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Direct
    }
}
