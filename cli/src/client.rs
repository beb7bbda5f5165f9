//! REST client for the Fastfeet server

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::messages::{
    ApiError, CreatedProblem, Delivery, DeliveryDetail, ProblemSummary, ProblemWithDate,
    ReportProblem,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP client for the Fastfeet API
#[derive(Clone)]
pub struct FastfeetClient {
    http: reqwest::Client,
    base: Url,
}

impl FastfeetClient {
    pub fn new(server: &str) -> Result<Self> {
        let mut base = Url::parse(server)?;
        // Relative joins replace the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// One page of problems, optionally filtered by description
    pub async fn list_problems(&self, page: u32, query: Option<&str>) -> Result<Vec<ProblemSummary>> {
        let mut params = vec![("page", page.to_string())];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }

        let response = self
            .http
            .get(self.url("problems")?)
            .query(&params)
            .send()
            .await?;
        decode(response).await
    }

    /// Problems reported on one delivery
    pub async fn show_problems(&self, delivery_id: i64) -> Result<Vec<ProblemWithDate>> {
        let response = self
            .http
            .get(self.url(&format!("deliveries/{}/problems", delivery_id))?)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn report_problem(
        &self,
        delivery_id: i64,
        deliveryman_id: i64,
        description: &str,
    ) -> Result<CreatedProblem> {
        let response = self
            .http
            .post(self.url(&format!("deliveries/{}/problems", delivery_id))?)
            .json(&ReportProblem {
                description,
                deliveryman_id,
            })
            .send()
            .await?;
        decode(response).await
    }

    /// Cancel the delivery a problem was reported on
    pub async fn cancel_problem(&self, problem_id: i64) -> Result<DeliveryDetail> {
        let response = self
            .http
            .delete(self.url(&format!("problems/{}", problem_id))?)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_deliveries(&self, page: u32) -> Result<Vec<Delivery>> {
        let response = self
            .http
            .get(self.url("deliveries")?)
            .query(&[("page", page)])
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await?;
    let message = serde_json::from_str::<ApiError>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    tracing::debug!("Server returned {}: {}", status, message);

    Err(ClientError::Api { status, message })
}
