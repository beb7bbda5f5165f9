//! Delivery problem workflow
//!
//! Every state-changing operation runs validate, authorize, mutate and then
//! notify, in that order. A failing step stops the workflow before anything is
//! written.

use chrono::Utc;
use serde_json::Value;

use crate::auth::authorize;
use crate::error::{AppError, Result};
use crate::jobs::{CancellationMail, Job};
use crate::models::{
    CreateProblemRequest, CreatedProblem, DeliveryDetail, ProblemSummary, ProblemWithDate,
};
use crate::queue::Queue;
use crate::store::{CancelOutcome, Store};
use crate::validation;

/// Problems returned per page of the listing
pub const PAGE_SIZE: u32 = 6;

/// Problem operations over an injected store and job queue
pub struct Problems<'a> {
    store: &'a Store,
    queue: &'a Queue,
}

impl<'a> Problems<'a> {
    pub fn new(store: &'a Store, queue: &'a Queue) -> Self {
        Self { store, queue }
    }

    /// One page of problems, optionally filtered by description
    pub async fn list(&self, page: Option<i64>, query: Option<&str>) -> Result<Vec<ProblemSummary>> {
        let page = parse_page(page)?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        self.store.list_problems(query, page, PAGE_SIZE).await
    }

    /// Report a problem on a delivery owned by the reporting deliveryman
    pub async fn create(&self, delivery_id: i64, body: Value) -> Result<CreatedProblem> {
        let req: CreateProblemRequest = validation::CREATE_PROBLEM.parse(body)?;

        let delivery = self.store.get_delivery(delivery_id).await?;
        authorize(delivery.deliveryman_id, req.deliveryman_id)?;

        let problem = self.store.create_problem(delivery.id, &req.description).await?;
        tracing::info!(
            problem_id = problem.id,
            delivery_id = delivery.id,
            "problem reported"
        );

        Ok(problem.into())
    }

    /// Cancel the delivery a problem was reported on and notify its deliveryman.
    ///
    /// Fails with `Conflict` when the delivery is finished or already canceled;
    /// in that case nothing is written and no mail is queued. The delivery and
    /// its associations are loaded before the write, so a failed load leaves
    /// the delivery untouched.
    pub async fn cancel(&self, problem_id: i64) -> Result<DeliveryDetail> {
        let problem = self.store.get_problem(problem_id).await?;
        let mut delivery = self.store.get_delivery_detail(problem.delivery_id).await?;

        let canceled_at = Utc::now();
        match self.store.cancel_delivery(problem.delivery_id, canceled_at).await? {
            CancelOutcome::Canceled => {}
            CancelOutcome::AlreadyFinished => {
                return Err(AppError::Conflict(
                    "Can't cancel a finished delivery".to_string(),
                ))
            }
            CancelOutcome::AlreadyCanceled => {
                return Err(AppError::Conflict("Delivery already canceled".to_string()))
            }
            CancelOutcome::Missing => {
                return Err(AppError::NotFound("Delivery doesn't exist".to_string()))
            }
        }

        delivery.delivery.mark_canceled(canceled_at);
        tracing::info!(
            problem_id = problem.id,
            delivery_id = delivery.delivery.id,
            "delivery canceled"
        );

        self.queue.enqueue(Job::CancellationMail(CancellationMail {
            delivery: delivery.clone(),
            problem,
        }));

        Ok(delivery)
    }

    /// All problems reported on one delivery, oldest first
    pub async fn show(&self, delivery_id: i64) -> Result<Vec<ProblemWithDate>> {
        self.store.problems_for_delivery(delivery_id).await
    }
}

/// Pages are 1-indexed and default to the first one
pub fn parse_page(page: Option<i64>) -> Result<u32> {
    match page {
        None => Ok(1),
        Some(p) if p >= 1 => u32::try_from(p)
            .map_err(|_| AppError::Validation("page is too large".to_string())),
        Some(_) => Err(AppError::Validation(
            "page must be greater than or equal to 1".to_string(),
        )),
    }
}
