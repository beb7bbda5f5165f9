//! JSON types returned by the Fastfeet API
//!
//! These mirror the server's models. Some fields are not shown by the CLI but
//! are kept so responses decode completely.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Withdrawn,
    Delivered,
    Canceled,
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Withdrawn => "WITHDRAWN",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Canceled => "CANCELED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub id: i64,
    pub product: String,
    pub status: DeliveryStatus,
    pub recipient_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub id: i64,
    pub description: String,
    pub delivery: DeliverySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemWithDate {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliverySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedProblem {
    pub id: i64,
    pub delivery_id: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliveryman {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub state: String,
    pub city: String,
    pub zip_code: String,
}

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
}

/// A delivery with its deliveryman and recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetail {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub deliveryman: Deliveryman,
    pub recipient: Recipient,
}

/// Error body sent with every non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: String,
}

/// Body of a problem report
#[derive(Debug, Clone, Serialize)]
pub struct ReportProblem<'a> {
    pub description: &'a str,
    pub deliveryman_id: i64,
}
