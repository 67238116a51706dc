//! Outgoing email seam.
//!
//! Delivery itself is out of scope for this service, so the default
//! [`LogMailer`] writes the message to the tracing log. A real transport
//! only needs to implement [`Mailer`].

use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> anyhow::Result<()>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> anyhow::Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Outgoing email"
        );
        metrics::counter!("emails_sent_total").increment(1);
        Ok(())
    }
}

#[must_use]
pub fn password_reset_message(to: &str, token: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "EduFlow password reset".to_string(),
        body: format!(
            "A password reset was requested for your EduFlow account.\n\n\
             Reset token: {token}\n\n\
             The token expires in one hour. Ignore this email if you did not ask for it."
        ),
    }
}

#[must_use]
pub fn permission_access_message(to: &str, code: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "EduFlow permissions access code".to_string(),
        body: format!(
            "Use this code to unlock PIN permission management: {code}\n\n\
             The code expires in 15 minutes."
        ),
    }
}

#[must_use]
pub fn login_code_message(to: &str, code: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: format!("EduFlow sign-in code: {code}"),
        body: format!(
            "Your EduFlow sign-in code is {code}.\n\n\
             It is valid for 15 minutes."
        ),
    }
}

#[cfg(test)]
pub mod testing {
    use super::{MailMessage, Mailer};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Captures messages for assertions.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: MailMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }
}
