//! SMTP notifier.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::Notifier;
use crate::config::MtaConfig;
use crate::error_handling::NotifyError;

/// Sends reports as HTML e-mails through the MTA of `_mta.yml`.
pub struct EmailNotifier {
    config: MtaConfig,
}

impl EmailNotifier {
    pub fn new(config: MtaConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let builder = if self.config.ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
        } else if self.config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
        };

        let mut builder = builder.port(self.config.port);
        if self.config.has_credentials() {
            builder = builder.credentials(Credentials::new(
                self.config.user.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }

    fn message(&self, receiver: &str, html: &str) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.config.from.parse()?)
            .to(receiver.parse()?)
            .subject(self.config.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, receiver: &str, html: &str) -> Result<(), NotifyError> {
        let message = self.message(receiver, html)?;
        let mailer = self.transport()?;
        mailer.send(message).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}
