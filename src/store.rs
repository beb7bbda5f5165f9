//! Database store for deliveries, deliverymen, recipients and problems

use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::{
    CreateDeliveryRequest, CreateDeliverymanRequest, CreateRecipientRequest, Delivery,
    DeliveryDetail, DeliveryProblem, DeliveryStatus, DeliverySummary, Deliveryman,
    ProblemSummary, ProblemWithDate, Recipient,
};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Result of the guarded cancel update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled,
    AlreadyFinished,
    AlreadyCanceled,
    Missing,
}

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Deliveryman operations

    pub async fn create_deliveryman(&self, req: &CreateDeliverymanRequest) -> Result<Deliveryman> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO deliverymen (name, email, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Deliveryman {
            id,
            name: req.name.clone(),
            email: req.email.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_deliveryman(&self, id: i64) -> Result<Deliveryman> {
        sqlx::query_as::<_, Deliveryman>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM deliverymen
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Deliveryman {} not found", id)))
    }

    pub async fn list_deliverymen(&self) -> Result<Vec<Deliveryman>> {
        let rows = sqlx::query_as::<_, Deliveryman>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM deliverymen
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // Recipient operations

    pub async fn create_recipient(&self, req: &CreateRecipientRequest) -> Result<Recipient> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO recipients (name, street, number, complement, state, city, zip_code, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(&req.street)
        .bind(&req.number)
        .bind(&req.complement)
        .bind(&req.state)
        .bind(&req.city)
        .bind(&req.zip_code)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Recipient {
            id,
            name: req.name.clone(),
            street: req.street.clone(),
            number: req.number.clone(),
            complement: req.complement.clone(),
            state: req.state.clone(),
            city: req.city.clone(),
            zip_code: req.zip_code.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_recipient(&self, id: i64) -> Result<Recipient> {
        sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id, name, street, number, complement, state, city, zip_code, created_at, updated_at
            FROM recipients
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipient {} not found", id)))
    }

    pub async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id, name, street, number, complement, state, city, zip_code, created_at, updated_at
            FROM recipients
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // Delivery operations

    pub async fn create_delivery(&self, req: &CreateDeliveryRequest) -> Result<Delivery> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO deliveries (product, recipient_id, deliveryman_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.product)
        .bind(req.recipient_id)
        .bind(req.deliveryman_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Delivery {
            id,
            product: req.product.clone(),
            status: DeliveryStatus::Pending,
            recipient_id: req.recipient_id,
            deliveryman_id: req.deliveryman_id,
            start_date: None,
            end_date: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_delivery(&self, id: i64) -> Result<Delivery> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, product, recipient_id, deliveryman_id, start_date, end_date, canceled_at, created_at, updated_at
            FROM deliveries
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery doesn't exist".to_string()))?;

        Ok(row.into())
    }

    /// Fetch a delivery with its deliveryman and recipient attached
    pub async fn get_delivery_detail(&self, id: i64) -> Result<DeliveryDetail> {
        let delivery = self.get_delivery(id).await?;
        let deliveryman = self.get_deliveryman(delivery.deliveryman_id).await?;
        let recipient = self.get_recipient(delivery.recipient_id).await?;

        Ok(DeliveryDetail {
            delivery,
            deliveryman,
            recipient,
        })
    }

    pub async fn list_deliveries(&self, page: u32, page_size: u32) -> Result<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, product, recipient_id, deliveryman_id, start_date, end_date, canceled_at, created_at, updated_at
            FROM deliveries
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(page_size))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Delivery::from).collect())
    }

    /// Mark a pending delivery as withdrawn by its deliveryman
    pub async fn start_delivery(&self, id: i64) -> Result<Delivery> {
        let now = Utc::now();

        let changed = sqlx::query(
            r#"
            UPDATE deliveries SET start_date = ?, updated_at = ?
            WHERE id = ? AND start_date IS NULL AND canceled_at IS NULL
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let delivery = self.get_delivery(id).await?;
        if changed == 0 {
            return Err(transition_conflict(&delivery));
        }
        Ok(delivery)
    }

    /// Mark a withdrawn delivery as delivered
    pub async fn finish_delivery(&self, id: i64) -> Result<Delivery> {
        let now = Utc::now();

        let changed = sqlx::query(
            r#"
            UPDATE deliveries SET end_date = ?, updated_at = ?
            WHERE id = ? AND start_date IS NOT NULL AND end_date IS NULL AND canceled_at IS NULL
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let delivery = self.get_delivery(id).await?;
        if changed == 0 {
            return Err(transition_conflict(&delivery));
        }
        Ok(delivery)
    }

    /// Set `canceled_at` unless the delivery is finished or already canceled.
    ///
    /// The check and the write happen in one conditional UPDATE, so among
    /// concurrent callers exactly one observes [`CancelOutcome::Canceled`].
    pub async fn cancel_delivery(&self, id: i64, at: DateTime<Utc>) -> Result<CancelOutcome> {
        let mut tx = self.pool.begin().await?;

        let changed = sqlx::query(
            r#"
            UPDATE deliveries SET canceled_at = ?, updated_at = ?
            WHERE id = ? AND end_date IS NULL AND canceled_at IS NULL
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if changed > 0 {
            CancelOutcome::Canceled
        } else {
            let state = sqlx::query_as::<_, (Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
                "SELECT end_date, canceled_at FROM deliveries WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            match state {
                None => CancelOutcome::Missing,
                Some((Some(_), _)) => CancelOutcome::AlreadyFinished,
                Some((None, Some(_))) => CancelOutcome::AlreadyCanceled,
                Some((None, None)) => {
                    return Err(AppError::Internal(format!(
                        "Delivery {} was open but could not be canceled",
                        id
                    )))
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    // Problem operations

    pub async fn create_problem(&self, delivery_id: i64, description: &str) -> Result<DeliveryProblem> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO delivery_problems (delivery_id, description, description_search, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(delivery_id)
        .bind(description)
        .bind(description.to_lowercase())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(DeliveryProblem {
            id,
            delivery_id,
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_problem(&self, id: i64) -> Result<DeliveryProblem> {
        sqlx::query_as::<_, DeliveryProblem>(
            r#"
            SELECT id, delivery_id, description, created_at, updated_at
            FROM delivery_problems
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))
    }

    /// One page of problems, optionally filtered by a case-insensitive
    /// substring of the description.
    ///
    /// Matching runs against `description_search`, which holds the
    /// description lowercased by Rust so non-ASCII letters fold too.
    pub async fn list_problems(
        &self,
        filter: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProblemSummary>> {
        let pattern = filter.map(|q| format!("%{}%", escape_like(&q.to_lowercase())));

        let rows = sqlx::query_as::<_, ProblemRow>(
            r#"
            SELECT p.id, p.description, p.created_at,
                   d.id AS delivery_id, d.product, d.recipient_id,
                   d.start_date, d.end_date, d.canceled_at
            FROM delivery_problems p
            JOIN deliveries d ON d.id = p.delivery_id
            WHERE (?1 IS NULL OR p.description_search LIKE ?1 ESCAPE '\')
            ORDER BY p.id ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(pattern)
        .bind(i64::from(page_size))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (id, description, _, delivery) = row.split();
                ProblemSummary {
                    id,
                    description,
                    delivery,
                }
            })
            .collect())
    }

    pub async fn problems_for_delivery(&self, delivery_id: i64) -> Result<Vec<ProblemWithDate>> {
        let rows = sqlx::query_as::<_, ProblemRow>(
            r#"
            SELECT p.id, p.description, p.created_at,
                   d.id AS delivery_id, d.product, d.recipient_id,
                   d.start_date, d.end_date, d.canceled_at
            FROM delivery_problems p
            JOIN deliveries d ON d.id = p.delivery_id
            WHERE p.delivery_id = ?
            ORDER BY p.id ASC
            "#,
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (id, description, created_at, delivery) = row.split();
                ProblemWithDate {
                    id,
                    description,
                    created_at,
                    delivery,
                }
            })
            .collect())
    }
}

fn offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(page_size)
}

/// Escape LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn transition_conflict(delivery: &Delivery) -> AppError {
    let reason = match delivery.status {
        DeliveryStatus::Canceled => "Delivery is canceled",
        DeliveryStatus::Delivered => "Delivery is already finished",
        DeliveryStatus::Withdrawn => "Delivery was already withdrawn",
        DeliveryStatus::Pending => "Delivery was not withdrawn yet",
    };
    AppError::Conflict(reason.to_string())
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i64,
    product: String,
    recipient_id: i64,
    deliveryman_id: i64,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            id: row.id,
            product: row.product,
            status: DeliveryStatus::from_dates(row.start_date, row.end_date, row.canceled_at),
            recipient_id: row.recipient_id,
            deliveryman_id: row.deliveryman_id,
            start_date: row.start_date,
            end_date: row.end_date,
            canceled_at: row.canceled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProblemRow {
    id: i64,
    description: String,
    created_at: DateTime<Utc>,
    delivery_id: i64,
    product: String,
    recipient_id: i64,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
}

impl ProblemRow {
    fn split(self) -> (i64, String, DateTime<Utc>, DeliverySummary) {
        let delivery = DeliverySummary {
            id: self.delivery_id,
            product: self.product,
            status: DeliveryStatus::from_dates(self.start_date, self.end_date, self.canceled_at),
            recipient_id: self.recipient_id,
        };
        (self.id, self.description, self.created_at, delivery)
    }
}
