use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Fulfillment status of a placed order.
///
/// `Preparing -> Shipping -> Shipped` is the linear path walked by
/// [`OrderStatus::advance`]. `Cancelled` is only reachable by setting it
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Preparing,
    Shipping,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Next status on the linear path. Terminal states stay put.
    pub fn advance(self) -> OrderStatus {
        match self {
            OrderStatus::Preparing => OrderStatus::Shipping,
            OrderStatus::Shipping => OrderStatus::Shipped,
            OrderStatus::Shipped => OrderStatus::Shipped,
            OrderStatus::Cancelled => OrderStatus::Cancelled,
        }
    }

    /// Whether moving from `self` to `next` hands the order's units back to
    /// inventory (`Some(true)`), takes them out again (`Some(false)`), or
    /// leaves stock alone (`None`).
    pub fn stock_effect(self, next: OrderStatus) -> Option<bool> {
        match (self == OrderStatus::Cancelled, next == OrderStatus::Cancelled) {
            (false, true) => Some(true),
            (true, false) => Some(false),
            _ => None,
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preparing" => Ok(OrderStatus::Preparing),
            "shipping" => Ok(OrderStatus::Shipping),
            "shipped" => Ok(OrderStatus::Shipped),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(AppError::InvalidStatus(raw.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
