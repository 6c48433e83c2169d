//! Fan-out delivery to registered users and the daily greeting schedule

use crate::registry::{UserId, UserRegistry};
use crate::transport::{OutgoingMessage, Transport};
use chrono::{DateTime, Days, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between deliveries of a scheduled alert
pub const ALERT_DELAY: Duration = Duration::from_millis(50);
/// Pause between deliveries of an admin broadcast
pub const ADMIN_BROADCAST_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct Broadcaster {
    registry: Arc<UserRegistry>,
    transport: Arc<dyn Transport>,
}

impl Broadcaster {
    pub fn new(registry: Arc<UserRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Send `text` to every recipient, one at a time.
    ///
    /// A failed delivery is logged and counted, never retried, and never
    /// stops the rest of the run.
    pub async fn deliver(
        &self,
        recipients: impl IntoIterator<Item = UserId>,
        text: &str,
        delay: Duration,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (i, chat) in recipients.into_iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self.transport.send(chat, OutgoingMessage::plain(text)).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::warn!(chat = %chat, error = %e, "Broadcast delivery failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    pub async fn broadcast_to_registered(&self, text: &str, delay: Duration) -> BroadcastReport {
        let recipients = self.registry.users().await;
        tracing::info!(recipients = recipients.len(), "Starting broadcast");
        let report = self.deliver(recipients, text, delay).await;
        tracing::info!(sent = report.sent, failed = report.failed, "Broadcast finished");
        report
    }
}

/// One daily greeting, fired at `at` (UTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlert {
    pub name: String,
    pub at: NaiveTime,
    pub message: String,
}

impl ScheduledAlert {
    fn new(name: &str, hour: u32, message: &str) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            at: NaiveTime::from_hms_opt(hour, 0, 0)?,
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    alerts: Vec<ScheduledAlert>,
}

impl Default for DailySchedule {
    fn default() -> Self {
        let alerts = [
            ScheduledAlert::new("morning", 1, "☀️ អរុណសួស្តី! Good Morning!"),
            ScheduledAlert::new("afternoon", 6, "☕ ទិវាសួស្តី! Good Afternoon!"),
            ScheduledAlert::new("evening", 13, "🌙 រាត្រីសួស្តី! Good Evening!"),
        ];
        Self {
            alerts: alerts.into_iter().flatten().collect(),
        }
    }
}

impl DailySchedule {
    /// Parse `HH:MM|text;HH:MM|text`. Entries are named after their time.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut alerts = Vec::new();

        for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (time, message) = entry
                .split_once('|')
                .ok_or_else(|| format!("missing '|' in alert entry {entry:?}"))?;
            let at = NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .map_err(|e| format!("bad time {:?}: {e}", time.trim()))?;
            let message = message.trim();
            if message.is_empty() {
                return Err(format!("empty message for alert at {}", time.trim()));
            }
            alerts.push(ScheduledAlert {
                name: at.format("%H:%M").to_string(),
                at,
                message: message.to_string(),
            });
        }

        if alerts.is_empty() {
            return Err("no alerts defined".to_string());
        }
        Ok(Self { alerts })
    }

    #[allow(dead_code)] // Used in tests
    pub fn alerts(&self) -> &[ScheduledAlert] {
        &self.alerts
    }

    /// The alert that fires first after `now`, with its firing time
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<(&ScheduledAlert, DateTime<Utc>)> {
        self.alerts
            .iter()
            .map(|alert| (alert, next_occurrence(now, alert.at)))
            .min_by_key(|(_, when)| *when)
    }

    /// Like [`Self::next_due`], but never at or before the last firing.
    ///
    /// If the wall clock steps backwards after an alert fired, the same
    /// slot would otherwise come due a second time.
    pub fn next_after(
        &self,
        now: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
    ) -> Option<(&ScheduledAlert, DateTime<Utc>)> {
        self.next_due(last_fired.map_or(now, |last| last.max(now)))
    }

    /// Fire alerts forever, until `cancel` is triggered
    pub async fn run(self, broadcaster: Arc<Broadcaster>, cancel: CancellationToken) {
        for alert in &self.alerts {
            tracing::info!(name = %alert.name, at = %alert.at, "Scheduled daily alert");
        }

        let mut last_fired = None;
        loop {
            let now = Utc::now();
            let Some((alert, when)) = self.next_after(now, last_fired) else {
                tracing::info!("No daily alerts configured");
                return;
            };
            let wait = (when - now).to_std().unwrap_or_default();

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Daily alert scheduler stopped");
                    return;
                }
                () = tokio::time::sleep(wait) => {}
            }

            last_fired = Some(when);
            tracing::info!(name = %alert.name, "Sending daily alert");
            broadcaster
                .broadcast_to_registered(&alert.message, ALERT_DELAY)
                .await;
        }
    }
}

/// Next instant strictly after `now` whose UTC time of day is `at`
pub fn next_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        now.date_naive()
            .checked_add_days(Days::new(1))
            .map_or(today, |tomorrow| tomorrow.and_time(at).and_utc())
    }
}
