//! Background jobs and how each one is carried out

use serde::Serialize;

use crate::mail::{Mail, MailError, Mailer};
use crate::models::{DeliveryDetail, DeliveryProblem};

/// Work handed to the background worker
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "key", content = "data")]
pub enum Job {
    CancellationMail(CancellationMail),
}

impl Job {
    /// Stable identifier of the job kind
    pub fn key(&self) -> &'static str {
        match self {
            Job::CancellationMail(_) => CancellationMail::KEY,
        }
    }

    pub async fn run<M: Mailer>(&self, mailer: &M) -> Result<(), MailError> {
        match self {
            Job::CancellationMail(job) => mailer.send(&job.render()).await,
        }
    }
}

/// Tells the deliveryman that a delivery was canceled because of a problem
#[derive(Debug, Clone, Serialize)]
pub struct CancellationMail {
    pub delivery: DeliveryDetail,
    pub problem: DeliveryProblem,
}

impl CancellationMail {
    pub const KEY: &'static str = "CancellationMail";

    pub fn render(&self) -> Mail {
        let deliveryman = &self.delivery.deliveryman;
        let recipient = &self.delivery.recipient;

        let body = format!(
            "Hello {},\n\n\
             The delivery #{} ({}) for {} was canceled.\n\
             Address: {}\n\
             Reported problem: {}\n",
            deliveryman.name,
            self.delivery.delivery.id,
            self.delivery.delivery.product,
            recipient.name,
            recipient.address(),
            self.problem.description,
        );

        Mail {
            to: format!("{} <{}>", deliveryman.name, deliveryman.email),
            subject: "Delivery canceled".to_string(),
            body,
        }
    }
}
