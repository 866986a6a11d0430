//! SMS notifications: number normalization, transports, dispatch and queueing

pub mod dispatcher;
pub mod phone;
pub mod queue;
pub mod transport;

pub use dispatcher::{DeliveryOutcome, MessageLog, RelayOutcome, SmsDispatcher};
pub use queue::{NotificationQueue, Notifier, RetryPolicy};
pub use transport::{RelayTransport, SmsError, SmsReceipt, SmsTransport, TwilioTransport};
