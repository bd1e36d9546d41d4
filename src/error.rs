use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing shipping fields: {}", .0.join(", "))]
    IncompleteShipping(Vec<&'static str>),

    #[error("Invalid size {0:?}, expected one of XS, S, M, L, XL")]
    InvalidSize(String),

    #[error("Product {0} is not available")]
    ProductUnavailable(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Insufficient stock for {name}")]
    InsufficientStock { product_id: Uuid, name: String },

    #[error("Invalid order status {0:?}")]
    InvalidStatus(String),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::EmptyCart
            | AppError::IncompleteShipping(_)
            | AppError::InvalidSize(_)
            | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ProductUnavailable(_) | AppError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Coarse flag used by the checkout form redirect; never carries detail.
    pub fn checkout_flag(&self) -> &'static str {
        match self {
            AppError::EmptyCart => "empty",
            AppError::IncompleteShipping(_) => "shipping",
            AppError::InvalidSize(_)
            | AppError::ProductUnavailable(_)
            | AppError::ProductNotFound(_)
            | AppError::InsufficientStock { .. } => "stock",
            _ => "failed",
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database error");
                self.to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_race_maps_to_conflict_not_server_error() {
        let err = AppError::InsufficientStock {
            product_id: Uuid::nil(),
            name: "Tee".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Insufficient stock for Tee");
        assert_eq!(err.checkout_flag(), "stock");
    }

    #[test]
    fn infrastructure_errors_hide_detail() {
        let err = AppError::OrmError(sea_orm::DbErr::Custom("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "ORM error");
        assert_eq!(err.checkout_flag(), "failed");
    }

    #[test]
    fn incomplete_shipping_lists_fields() {
        let err = AppError::IncompleteShipping(vec!["city", "postal_code"]);
        assert_eq!(err.to_string(), "Missing shipping fields: city, postal_code");
        assert_eq!(err.checkout_flag(), "shipping");
    }
}
