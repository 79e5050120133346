//! Mapping from component errors to `{error, message}` responses.

use crate::rest::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use storefront_billing::PaymentError;
use storefront_checkout::CheckoutError;
use storefront_core::ValidationError;
use storefront_tenancy::{ResolutionError, TicketError};
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn not_found(error: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            metrics::counter!("api.errors").increment(1);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.error.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ResolutionError> for ApiError {
    fn from(err: ResolutionError) -> Self {
        Self::not_found("store_not_found", err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        metrics::counter!("api.validation_errors").increment(1);
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Invalid(v) => v.into(),
            CheckoutError::Submission(e) => {
                Self::new(StatusCode::BAD_GATEWAY, "order_submission_failed", e.to_string())
            }
            CheckoutError::Datastore(e) => {
                Self::new(StatusCode::BAD_GATEWAY, "datastore_error", e.to_string())
            }
            CheckoutError::Session(e) => {
                error!(error = %e, "Session storage failed");
                Self::internal("session storage unavailable")
            }
        }
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::Invalid(v) => v.into(),
            TicketError::Datastore(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "support_unavailable", err.to_string())
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let (status, code) = match &err {
            PaymentError::Unsupported { .. } => (StatusCode::NOT_IMPLEMENTED, "provider_unsupported"),
            PaymentError::NotConfigured(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "provider_not_configured")
            }
            PaymentError::MalformedSignature(_)
            | PaymentError::SignatureMismatch
            | PaymentError::TimestampOutOfTolerance(_) => {
                (StatusCode::BAD_REQUEST, "invalid_webhook_signature")
            }
            PaymentError::Decode(_) => (StatusCode::BAD_REQUEST, "invalid_webhook_payload"),
            PaymentError::Transport(_)
            | PaymentError::Rejected { .. }
            | PaymentError::MissingCheckoutUrl => (StatusCode::BAD_GATEWAY, "provider_error"),
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<storefront_datastore::DatastoreError> for ApiError {
    fn from(err: storefront_datastore::DatastoreError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "datastore_error", err.to_string())
    }
}
