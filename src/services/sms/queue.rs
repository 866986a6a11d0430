//! Background notification queue with retry and dead-letter handling

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::dispatcher::{log_locally, DeliveryOutcome, SmsDispatcher};
use crate::{config::SmsConfig, models::notification::DeadLetter};

/// Fire-and-forget notification sink used by the loan services
pub trait Notifier: Send + Sync {
    fn notify(&self, phone: &str, message: String);
}

#[derive(Debug)]
enum Job {
    Send { phone: String, message: String },
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&SmsConfig> for RetryPolicy {
    fn from(config: &SmsConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

#[derive(Clone, Default)]
struct DeadLetters(Arc<Mutex<Vec<DeadLetter>>>);

impl DeadLetters {
    fn lock(&self) -> MutexGuard<'_, Vec<DeadLetter>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, to: &str, message: &str, attempts: u32, reason: &str) {
        tracing::warn!("Dead-lettering SMS to {} after {} attempt(s): {}", to, attempts, reason);
        self.lock().push(DeadLetter {
            id: Uuid::new_v4(),
            to: to.to_string(),
            message: message.to_string(),
            attempts,
            reason: reason.to_string(),
            failed_at: Utc::now(),
        });
    }
}

/// Bounded queue drained by a single worker task.
///
/// `notify` never waits: a full or stopped queue dead-letters the message
/// straight away.
pub struct NotificationQueue {
    sender: mpsc::Sender<Job>,
    receiver: Mutex<Option<mpsc::Receiver<Job>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    dispatcher: SmsDispatcher,
    policy: RetryPolicy,
    dead_letters: DeadLetters,
}

impl NotificationQueue {
    pub fn new(dispatcher: SmsDispatcher, capacity: usize, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            worker: tokio::sync::Mutex::new(None),
            dispatcher,
            policy,
            dead_letters: DeadLetters::default(),
        }
    }

    pub fn dispatcher(&self) -> &SmsDispatcher {
        &self.dispatcher
    }

    /// Spawn the worker. Calling it again is a no-op.
    pub async fn start(&self) {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(receiver) = receiver else {
            return;
        };

        let handle = tokio::spawn(run_worker(
            receiver,
            self.dispatcher.clone(),
            self.policy,
            self.dead_letters.clone(),
        ));
        *self.worker.lock().await = Some(handle);
        tracing::info!("Notification queue started");
    }

    /// Drain what is already queued, then stop the worker
    pub async fn shutdown(&self) {
        let Some(handle) = self.worker.lock().await.take() else {
            return;
        };

        if self.sender.send(Job::Shutdown).await.is_err() {
            tracing::warn!("Notification worker already gone");
        }
        if let Err(e) = handle.await {
            tracing::error!("Notification worker panicked: {}", e);
        }
        tracing::info!("Notification queue stopped");
    }

    /// Messages the queue gave up on, newest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().iter().rev().cloned().collect()
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, phone: &str, message: String) {
        let job = Job::Send {
            phone: phone.to_string(),
            message,
        };

        match self.sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(Job::Send { phone, message })) => {
                log_locally(&phone, &message, "queue full");
                self.dead_letters.push(&phone, &message, 0, "queue full");
            }
            Err(TrySendError::Closed(Job::Send { phone, message })) => {
                log_locally(&phone, &message, "queue closed");
                self.dead_letters.push(&phone, &message, 0, "queue closed");
            }
            Err(_) => {}
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Job>,
    dispatcher: SmsDispatcher,
    policy: RetryPolicy,
    dead_letters: DeadLetters,
) {
    while let Some(job) = receiver.recv().await {
        let (phone, message) = match job {
            Job::Send { phone, message } => (phone, message),
            Job::Shutdown => {
                dead_letter_remaining(&mut receiver, &dead_letters);
                break;
            }
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let reason = match dispatcher.deliver(&phone, &message).await {
                DeliveryOutcome::Delivered { channel, receipt } => {
                    tracing::debug!(
                        "SMS to {} delivered via {:?} on attempt {} ({})",
                        phone,
                        channel,
                        attempts,
                        receipt.message_id
                    );
                    break;
                }
                DeliveryOutcome::Undelivered { reason } => reason,
            };

            if attempts > policy.max_retries {
                log_locally(&phone, &message, &reason);
                dead_letters.push(&phone, &message, attempts, &reason);
                break;
            }
            tokio::time::sleep(policy.backoff * attempts).await;
        }
    }
}

/// Closes the channel and dead-letters every message still queued behind
/// the shutdown marker
fn dead_letter_remaining(receiver: &mut mpsc::Receiver<Job>, dead_letters: &DeadLetters) {
    receiver.close();
    while let Ok(job) = receiver.try_recv() {
        if let Job::Send { phone, message } = job {
            log_locally(&phone, &message, "queue shut down");
            dead_letters.push(&phone, &message, 0, "queue shut down");
        }
    }
}

/// Notifier that only records what it was asked to send
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, phone: &str, message: String) {
        self.sent.lock().unwrap().push((phone.to_string(), message));
    }
}
