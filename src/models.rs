//! Data models for deliveries, deliverymen, recipients and delivery problems

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A courier that picks up and delivers packages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deliveryman {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The person a delivery is addressed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipient {
    pub id: i64,
    pub name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub state: String,
    pub city: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipient {
    /// Single-line postal address
    pub fn address(&self) -> String {
        let mut line = format!("{}, {}", self.street, self.number);
        if let Some(complement) = self.complement.as_deref().filter(|c| !c.is_empty()) {
            line.push_str(" - ");
            line.push_str(complement);
        }
        format!("{}, {} - {}, {}", line, self.city, self.state, self.zip_code)
    }
}

/// A package on its way from the distributor to a recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub product: String,
    pub status: DeliveryStatus,
    pub recipient_id: i64,
    pub deliveryman_id: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Reflect a cancellation written at `at` without reloading the row
    pub fn mark_canceled(&mut self, at: DateTime<Utc>) {
        self.canceled_at = Some(at);
        self.updated_at = at;
        self.status = DeliveryStatus::from_dates(self.start_date, self.end_date, self.canceled_at);
    }
}

/// Lifecycle of a delivery, derived from its timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Withdrawn,
    Delivered,
    Canceled,
}

impl DeliveryStatus {
    /// Cancellation wins over every other state.
    pub fn from_dates(
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Self {
        if canceled_at.is_some() {
            DeliveryStatus::Canceled
        } else if end_date.is_some() {
            DeliveryStatus::Delivered
        } else if start_date.is_some() {
            DeliveryStatus::Withdrawn
        } else {
            DeliveryStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Withdrawn => "withdrawn",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Canceled => "canceled",
        }
    }
}

/// Minimal delivery attributes nested into problem listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub id: i64,
    pub product: String,
    pub status: DeliveryStatus,
    pub recipient_id: i64,
}

/// A delivery with its deliveryman and recipient eagerly loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetail {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub deliveryman: Deliveryman,
    pub recipient: Recipient,
}

/// An incident reported by a deliveryman about one delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryProblem {
    pub id: i64,
    pub delivery_id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the paginated problem listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub id: i64,
    pub description: String,
    pub delivery: DeliverySummary,
}

/// Row of the per-delivery problem listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemWithDate {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliverySummary,
}

/// Response body of a successful problem report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedProblem {
    pub id: i64,
    pub delivery_id: i64,
    pub description: String,
}

impl From<DeliveryProblem> for CreatedProblem {
    fn from(problem: DeliveryProblem) -> Self {
        Self {
            id: problem.id,
            delivery_id: problem.delivery_id,
            description: problem.description,
        }
    }
}

/// Request to report a problem on a delivery
#[derive(Debug, Deserialize)]
pub struct CreateProblemRequest {
    pub description: String,
    pub deliveryman_id: i64,
}

/// Request to register a deliveryman
#[derive(Debug, Deserialize)]
pub struct CreateDeliverymanRequest {
    pub name: String,
    pub email: String,
}

/// Request to register a recipient
#[derive(Debug, Deserialize)]
pub struct CreateRecipientRequest {
    pub name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub state: String,
    pub city: String,
    pub zip_code: String,
}

/// Request to create a delivery
#[derive(Debug, Deserialize)]
pub struct CreateDeliveryRequest {
    pub product: String,
    pub recipient_id: i64,
    pub deliveryman_id: i64,
}
