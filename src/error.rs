use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

/// Errors surfaced by the staking operations.
///
/// Degenerate odds and probabilities inside a projection never reach this
/// type: the odds math returns neutral values for them instead. Only bad
/// inputs to the public operations (amounts, labels, horizons) are raised.
#[derive(Error, Debug)]
pub enum StakingError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("bankroll not set up for user {0}")]
    NotFound(i64),

    #[error("no bet candidate {0}")]
    CandidateNotFound(i64),

    #[error("invalid decimal odds: {0} (must be greater than 1.0)")]
    InvalidOdds(f64),

    #[error("unknown risk profile '{0}' (expected low, medium or high)")]
    InvalidRiskProfile(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl StakingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StakingError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StakingError::Validation { .. }
            | StakingError::InvalidOdds(_)
            | StakingError::InvalidRiskProfile(_) => StatusCode::BAD_REQUEST,
            StakingError::NotFound(_) | StakingError::CandidateNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            StakingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StakingError {
    fn into_response(self) -> Response {
        let body = match &self {
            StakingError::Validation { field, message } => json!({
                "error": "validation_error",
                "field": field,
                "message": message,
            }),
            StakingError::NotFound(_) => json!({
                "error": "not_found",
                "message": "Bankroll not set up yet",
            }),
            StakingError::CandidateNotFound(_) => json!({
                "error": "not_found",
                "message": self.to_string(),
            }),
            StakingError::InvalidOdds(_) => json!({
                "error": "invalid_odds",
                "message": self.to_string(),
            }),
            StakingError::InvalidRiskProfile(_) => json!({
                "error": "invalid_risk_profile",
                "message": self.to_string(),
            }),
            StakingError::Persistence(e) => {
                tracing::error!("Persistence failure: {}", e);
                json!({
                    "error": "internal_error",
                    "message": "storage failure",
                })
            }
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            StakingError::validation("current_amount", "must be positive").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(StakingError::NotFound(7).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            StakingError::CandidateNotFound(7).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StakingError::Persistence(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = StakingError::validation("target_profit", "must be positive");
        assert_eq!(err.to_string(), "invalid target_profit: must be positive");
    }
}
