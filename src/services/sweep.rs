//! Periodic and on-demand overdue sweep

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::LoanStatus,
    repository::Repository,
    services::{
        clock::Clock,
        overdue::classify,
        sms::Notifier,
        templates::{overdue_template, SmsTemplate},
    },
};

/// Summary of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub students_checked: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub notifications_queued: usize,
}

#[derive(Clone)]
pub struct OverdueSweep {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl OverdueSweep {
    pub fn new(repository: Repository, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifier,
            clock,
        }
    }

    /// Classify every loan of every active student and queue reminders.
    ///
    /// Each student's `overdue_books` is set to the number of loans overdue
    /// right now, so repeated runs leave the same count.
    pub async fn run(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();

        let (report, outbox) = self
            .repository
            .ledger
            .update(move |students| {
                let mut report = SweepReport::default();
                let mut outbox = Vec::new();

                for student in students.iter_mut().filter(|s| s.is_active) {
                    report.students_checked += 1;
                    let mut overdue = 0u32;

                    for loan in student.loans() {
                        let message = match classify(loan.borrow_date, now) {
                            LoanStatus::Overdue { days_overdue } => {
                                overdue += 1;
                                report.overdue += 1;
                                overdue_template(&loan.title, days_overdue).render()
                            }
                            LoanStatus::DueSoon { days_left } => {
                                report.due_soon += 1;
                                SmsTemplate::DueReminder {
                                    title: &loan.title,
                                    days_left,
                                }
                                .render()
                            }
                            LoanStatus::Normal => continue,
                        };

                        if let Some(phone) = student.mobile() {
                            outbox.push((phone.to_string(), message));
                        }
                    }

                    if student.overdue_books != overdue {
                        tracing::debug!(
                            "Overdue count for {}: {} -> {}",
                            student.email,
                            student.overdue_books,
                            overdue
                        );
                    }
                    student.overdue_books = overdue;
                }

                Ok((report, outbox))
            })
            .await?;

        let mut report = report;
        for (phone, message) in outbox {
            self.notifier.notify(&phone, message);
            report.notifications_queued += 1;
        }

        tracing::info!(
            "Overdue sweep: {} students, {} overdue, {} due soon, {} notifications",
            report.students_checked,
            report.overdue,
            report.due_soon,
            report.notifications_queued
        );
        Ok(report)
    }

    /// Run now and then every `period`. Missed ticks are skipped.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(e) = self.run().await {
                    tracing::warn!("Overdue sweep failed: {}", e);
                }
            }
        })
    }
}
