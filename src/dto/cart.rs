use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::Quantity, models::LineItem};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub size: String,
    #[serde(default, alias = "quantity")]
    pub qty: Quantity,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    #[serde(default, alias = "quantity")]
    pub qty: Quantity,
}

/// Result of an add. `item_count` is what a storefront shows on its cart
/// badge.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartResult {
    pub ok: bool,
    pub item: LineItem,
    pub item_count: i64,
}
