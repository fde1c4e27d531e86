//! Best-effort moderation notifications.
//!
//! Submissions held for review generate an email to the moderation
//! inbox. Delivery is fire-and-forget through a bounded queue: a full
//! queue or a failed send is logged and dropped, and can never affect a
//! submission's result.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use huella_core::Config;

const QUEUE_SIZE: usize = 256;

/// Notice sent when a submission lands in the review queue.
#[derive(Debug, Clone)]
pub struct PendingSubmissionNotice {
    pub sighting_id: Uuid,
    pub post_number: i64,
    pub reason: String,
    pub service: String,
}

/// SMTP delivery for moderation notices. No-op construction if email
/// notifications are disabled or SMTP is not configured.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    to: String,
}

impl EmailNotifier {
    /// Create the notifier from config. Returns `None` if disabled or SMTP
    /// not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_notifications_enabled {
            tracing::debug!("Email notifications disabled (EMAIL_NOTIFICATIONS_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host.as_deref()?;
        let from = config.smtp_from.clone()?;
        let to = config.moderation_notify_to.clone()?;
        let port = config.smtp_port.unwrap_or(587);

        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?;
        let builder = builder.port(port);
        let builder = if let (Some(user), Some(password)) =
            (config.smtp_user.clone(), config.smtp_password.clone())
        {
            builder.credentials(Credentials::new(user, password))
        } else {
            builder
        };

        tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP with STARTTLS)");

        Some(Self {
            mailer: Arc::new(builder.build()),
            from,
            to,
        })
    }

    async fn send(&self, notice: &PendingSubmissionNotice) -> Result<(), String> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| format!("Invalid SMTP_FROM: {}", e))?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| format!("Invalid MODERATION_NOTIFY_TO: {}", e))?;

        let body = format!(
            "Sighting #{} was held for review.\n\nReason: {}\nFlagged by: {}\nInternal id: {}\n",
            notice.post_number, notice.reason, notice.service, notice.sighting_id
        );

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("Sighting #{} pending review", notice.post_number))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| e.to_string())?;

        self.mailer.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Bounded fire-and-forget queue in front of the notifier.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: Option<mpsc::Sender<PendingSubmissionNotice>>,
}

impl NotificationQueue {
    /// Spawn the delivery worker. With no notifier configured the queue
    /// accepts and silently drops every notice.
    pub fn new(notifier: Option<EmailNotifier>) -> Self {
        let Some(notifier) = notifier else {
            return Self { tx: None };
        };

        let (tx, mut rx) = mpsc::channel::<PendingSubmissionNotice>(QUEUE_SIZE);

        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                if let Err(e) = notifier.send(&notice).await {
                    tracing::warn!(
                        sighting_id = %notice.sighting_id,
                        error = %e,
                        "Moderation notice delivery failed, dropping"
                    );
                } else {
                    tracing::info!(
                        sighting_id = %notice.sighting_id,
                        post_number = notice.post_number,
                        "Moderation notice sent"
                    );
                }
            }
        });

        Self { tx: Some(tx) }
    }

    /// Queue with no delivery backend.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue a notice. Never blocks and never fails the caller.
    pub fn enqueue(&self, notice: PendingSubmissionNotice) {
        let Some(ref tx) = self.tx else {
            tracing::debug!(
                sighting_id = %notice.sighting_id,
                "Notifications disabled, dropping moderation notice"
            );
            return;
        };

        if let Err(e) = tx.try_send(notice) {
            tracing::warn!(error = %e, "Notification queue full, dropping moderation notice");
        }
    }
}
