//! Fastfeet server - delivery management API

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod mail;
pub mod models;
pub mod problems;
pub mod queue;
pub mod store;
pub mod validation;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::problems::Problems;
use crate::queue::Queue;

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
    pub queue: Queue,
}

impl AppState {
    pub fn new(pool: SqlitePool, queue: Queue) -> Arc<Self> {
        Arc::new(Self {
            store: store::Store::new(pool),
            queue,
        })
    }

    pub fn problems(&self) -> Problems<'_> {
        Problems::new(&self.store, &self.queue)
    }
}
