use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{info, warn};

use crate::app::Result;
use crate::domain::{Notification, NotificationKind};
use crate::notify::{ChannelStatus, EmailMessage, Mailer};
use crate::store::{NotificationStore, UserStore};

pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub in_app: ChannelStatus,
    pub email: ChannelStatus,
}

/// Completion notices for a successful scrape: one in-app record plus an
/// email when the owner has an address on file. Channels fail independently
/// and never fail the scrape.
pub struct NotificationDispatcher<S> {
    store: Arc<S>,
    mailer: Arc<dyn Mailer + Send + Sync>,
    dashboard_url: String,
}

impl<S> NotificationDispatcher<S>
where
    S: NotificationStore + UserStore + Send + Sync,
{
    pub fn new(store: Arc<S>, mailer: Arc<dyn Mailer + Send + Sync>) -> Self {
        Self {
            store,
            mailer,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }

    pub fn with_dashboard_url(mut self, url: impl Into<String>) -> Self {
        self.dashboard_url = url.into();
        self
    }

    pub async fn notify(&self, owner_id: &str, target_url: &str, item_count: usize) -> DispatchReport {
        let in_app = match self.record_in_app(owner_id, target_url, item_count) {
            Ok(_) => ChannelStatus::Sent,
            Err(e) => {
                warn!(owner_id, channel = "in-app", error = %e, "Notification failed");
                ChannelStatus::Failed(e.to_string())
            }
        };

        let email = match self.store.find_user_email(owner_id) {
            Ok(Some(address)) => {
                let message = completion_email(&address, target_url, item_count, &self.dashboard_url);
                let status = ChannelStatus::from_result(self.mailer.send(&message).await);
                if let ChannelStatus::Failed(reason) = &status {
                    warn!(owner_id, channel = "email", error = %reason, "Notification failed");
                }
                status
            }
            Ok(None) => {
                info!(owner_id, "No email address on file, skipping email notification");
                ChannelStatus::Skipped
            }
            Err(e) => {
                warn!(owner_id, channel = "email", error = %e, "Could not look up owner email");
                ChannelStatus::Failed(e.to_string())
            }
        };

        DispatchReport { in_app, email }
    }

    fn record_in_app(&self, owner_id: &str, target_url: &str, item_count: usize) -> Result<i64> {
        let notification = Notification::new(
            owner_id,
            "Scraping Completed",
            format!("Found {} items from {}", item_count, target_url),
            NotificationKind::Success,
        );
        self.store.create_notification(&notification)
    }
}

pub fn completion_email(to: &str, target_url: &str, item_count: usize, dashboard_url: &str) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h2 style="color: #4F46E5;">Scraping Task Finished</h2>
  <p>Your scraping task for <strong>{url}</strong> has completed successfully.</p>
  <p><strong>{count}</strong> items were found and saved to your database.</p>
  <p><a href="{dashboard}">View Dashboard</a></p>
</div>"#,
        url = encode_text(target_url),
        count = item_count,
        dashboard = encode_double_quoted_attribute(dashboard_url),
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("Scraping Completed: {} items found", item_count),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PricewatchError;
    use crate::domain::User;
    use crate::notify::testing::RecordingMailer;
    use crate::store::MemoryStore;

    /// Notification writes always fail; users still resolve.
    struct BrokenNotifications(MemoryStore);

    impl NotificationStore for BrokenNotifications {
        fn create_notification(&self, _: &Notification) -> Result<i64> {
            Err(PricewatchError::Other("disk full".into()))
        }
        fn list_notifications(&self, owner_id: &str) -> Result<Vec<Notification>> {
            self.0.list_notifications(owner_id)
        }
    }

    impl UserStore for BrokenNotifications {
        fn add_user(&self, user: &User) -> Result<()> {
            self.0.add_user(user)
        }
        fn find_user_email(&self, owner_id: &str) -> Result<Option<String>> {
            self.0.find_user_email(owner_id)
        }
    }

    #[tokio::test]
    async fn test_notify_records_and_emails() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_user(&User::new("alice", Some("alice@example.com".into())))
            .unwrap();
        let mailer = RecordingMailer::default();
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));

        let report = dispatcher.notify("alice", "https://s.example/list", 4).await;

        assert_eq!(report.in_app, ChannelStatus::Sent);
        assert_eq!(report.email, ChannelStatus::Sent);

        let notes = store.list_notifications("alice").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Scraping Completed");
        assert_eq!(notes[0].message, "Found 4 items from https://s.example/list");
        assert_eq!(notes[0].kind, NotificationKind::Success);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].subject, "Scraping Completed: 4 items found");
        assert!(sent[0].html.contains(DEFAULT_DASHBOARD_URL));
    }

    #[tokio::test]
    async fn test_missing_email_skips_email_only() {
        let store = Arc::new(MemoryStore::new());
        let mailer = RecordingMailer::default();
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));

        let report = dispatcher.notify("bob", "https://s.example", 1).await;

        assert_eq!(report.in_app, ChannelStatus::Sent);
        assert_eq!(report.email, ChannelStatus::Skipped);
        assert!(mailer.sent().is_empty());
        assert_eq!(store.list_notifications("bob").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_email_failure_keeps_in_app() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_user(&User::new("alice", Some("alice@example.com".into())))
            .unwrap();
        let dispatcher =
            NotificationDispatcher::new(store.clone(), Arc::new(RecordingMailer::failing()));

        let report = dispatcher.notify("alice", "https://s.example", 2).await;

        assert_eq!(report.in_app, ChannelStatus::Sent);
        assert!(matches!(report.email, ChannelStatus::Failed(_)));
        assert_eq!(store.list_notifications("alice").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_app_failure_still_emails() {
        let inner = MemoryStore::new();
        inner
            .add_user(&User::new("alice", Some("alice@example.com".into())))
            .unwrap();
        let store = Arc::new(BrokenNotifications(inner));
        let mailer = RecordingMailer::default();
        let dispatcher = NotificationDispatcher::new(store, Arc::new(mailer.clone()));

        let report = dispatcher.notify("alice", "https://s.example", 2).await;

        assert!(matches!(report.in_app, ChannelStatus::Failed(_)));
        assert_eq!(report.email, ChannelStatus::Sent);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn test_completion_email_escapes_url() {
        let message = completion_email(
            "a@example.com",
            "https://s.example/?q=<script>",
            3,
            DEFAULT_DASHBOARD_URL,
        );
        assert!(message.html.contains("&lt;script&gt;"));
        assert!(!message.html.contains("<script>"));
    }
}
