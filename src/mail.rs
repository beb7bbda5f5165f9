//! Outgoing mail and the transports that deliver it

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

/// A rendered message ready for a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Delivers rendered mail
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, mail: &Mail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Mailer that writes every message to the log instead of a mail server
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "mail sent\n{}", mail.body);
        Ok(())
    }
}
