//! Ownership checks for deliverymen acting on deliveries

use crate::error::{AppError, Result};

/// Succeeds only when the caller is the recorded owner of the resource
pub fn authorize(owner_id: i64, caller_id: i64) -> Result<()> {
    if owner_id == caller_id {
        Ok(())
    } else {
        tracing::debug!(owner_id, caller_id, "ownership check failed");
        Err(AppError::Permission(
            "You don't have permission to create a problem to this delivery".to_string(),
        ))
    }
}
