pub mod dispatcher;
pub mod mail;
pub mod share;
pub mod whatsapp;

use std::fmt;

use async_trait::async_trait;

use crate::app::Result;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use mail::{HttpMailer, LogMailer};
pub use share::{ShareDetails, ShareNotifier, ShareStatus, ShareTargets};
pub use whatsapp::TwilioWhatsApp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[async_trait]
pub trait WhatsAppSender {
    /// `to` is a bare phone number; the channel prefix is added by the sender.
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Per-channel delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No recipient, nothing attempted.
    Skipped,
    Sent,
    Failed(String),
}

impl ChannelStatus {
    pub(crate) fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => ChannelStatus::Sent,
            Err(e) => ChannelStatus::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Skipped => f.write_str("none"),
            ChannelStatus::Sent => f.write_str("sent"),
            ChannelStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::app::PricewatchError;

    /// Records every message; fails when `fail` is set.
    #[derive(Clone, Default)]
    pub struct RecordingMailer {
        pub sent: Arc<Mutex<Vec<EmailMessage>>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<()> {
            if self.fail {
                return Err(PricewatchError::Notification("smtp down".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingWhatsApp {
        pub sent: Arc<Mutex<Vec<(String, String)>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl WhatsAppSender for RecordingWhatsApp {
        async fn send(&self, to: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(PricewatchError::Notification("twilio rejected".into()));
            }
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_status_display() {
        assert_eq!(ChannelStatus::Skipped.to_string(), "none");
        assert_eq!(ChannelStatus::Sent.to_string(), "sent");
        assert_eq!(
            ChannelStatus::Failed("timeout".into()).to_string(),
            "failed: timeout"
        );
    }
}
