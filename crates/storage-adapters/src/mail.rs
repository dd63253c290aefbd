use async_trait::async_trait;
use domains::{MailMessage, MailTransport, TransportError};
use tracing::info;

/// Writes outgoing mail to the log instead of a mail server.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMailTransport;

#[async_trait]
impl MailTransport for TracingMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        if message.to.trim().is_empty() {
            return Err(TransportError("message has no recipient".into()));
        }
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail delivered"
        );
        Ok(())
    }
}
