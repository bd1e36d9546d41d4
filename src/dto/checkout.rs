use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::Quantity,
    models::{LineItem, ShippingInfo},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyNowRequest {
    pub product_id: Uuid,
    pub size: String,
    #[serde(default, alias = "quantity")]
    pub qty: Quantity,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyNowResult {
    pub ok: bool,
    pub draft_id: Uuid,
}

/// Lines a checkout would consume, and where they come from.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub cart_id: Option<Uuid>,
    pub draft_id: Option<Uuid>,
}

/// Checkout form post. `draft_id` names a specific buy-now draft.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmCheckoutForm {
    #[serde(flatten)]
    pub shipping: ShippingInfo,
    #[serde(default, alias = "orderId", alias = "draftId")]
    pub draft_id: Option<String>,
}

impl ConfirmCheckoutForm {
    /// Blank or malformed ids count as absent.
    pub fn named_draft(&self) -> Option<Uuid> {
        self.draft_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}
