//! SMTP notifier.
//!
//! Implements [`Notifier`] with `lettre` over STARTTLS.  One connection per
//! message; alerts are rare enough that pooling buys nothing.

use core::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::debug;

use crate::app::ports::Notifier;
use crate::config::EmailConfig;
use crate::error::NotifyError;

const SMTP_TIMEOUT_SECS: u64 = 30;

pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from = config
            .from
            .as_deref()
            .unwrap_or(&config.username)
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Build(format!("sender address: {e}")))?;
        let to = config
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Build(format!("recipient address: {e}")))?;

        let transport = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|e| NotifyError::Build(format!("relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_owned())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(&message)
            .map_err(|e| NotifyError::Send(e.to_string()))?;
        debug!("Email: sent '{}' to {}", subject, self.to);
        Ok(())
    }
}
