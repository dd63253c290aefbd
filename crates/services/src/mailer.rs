use std::sync::Arc;

use domains::{Application, MailMessage, MailTransport};
use tracing::{info, warn};

pub const NEW_APPLICATION_SUBJECT: &str = "New application";
pub const NEW_APPLICATION_BODY: &str = "You have received a new application.";

/// Sender and recipient of board notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub sender: String,
    pub recipient: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sender: "admin@votresite.com".to_string(),
            recipient: "post@sonsite.com".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApplicationMailer {
    transport: Arc<dyn MailTransport>,
    settings: MailSettings,
}

impl ApplicationMailer {
    pub fn new(transport: Arc<dyn MailTransport>, settings: MailSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn message(&self) -> MailMessage {
        MailMessage {
            from: self.settings.sender.clone(),
            to: self.settings.recipient.clone(),
            subject: NEW_APPLICATION_SUBJECT.to_string(),
            body: NEW_APPLICATION_BODY.to_string(),
        }
    }

    /// Sends the new-application notice. Delivery failures are logged and
    /// never reach the caller.
    pub async fn notify_new_application(&self, application: &Application) {
        let message = self.message();
        match self.transport.send(&message).await {
            Ok(()) => info!(
                application_id = %application.id(),
                to = %message.to,
                "new application notification sent"
            ),
            Err(e) => warn!(
                application_id = %application.id(),
                error = %e,
                "could not send new application notification"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockMailTransport, TransportError};

    #[tokio::test]
    async fn sends_fixed_notice_to_configured_recipient() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.from == "admin@votresite.com"
                    && m.to == "post@sonsite.com"
                    && m.subject == "New application"
                    && m.body == "You have received a new application."
            })
            .times(1)
            .returning(|_| Ok(()));
        let mailer = ApplicationMailer::new(Arc::new(transport), MailSettings::default());

        mailer
            .notify_new_application(&Application::new("Marine", "Je suis motivée"))
            .await;
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError("connection refused".into())));
        let settings = MailSettings {
            sender: "board@example.org".into(),
            recipient: "hr@example.org".into(),
        };
        let mailer = ApplicationMailer::new(Arc::new(transport), settings);

        mailer
            .notify_new_application(&Application::new("Marine", "Je suis motivée"))
            .await;
        assert_eq!(mailer.message().to, "hr@example.org");
    }
}
