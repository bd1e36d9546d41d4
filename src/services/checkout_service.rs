use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::{
    domain::{CheckoutMode, CheckoutSession, Owner},
    dto::checkout::{CheckoutSummary, ConfirmCheckoutForm},
    error::{AppError, AppResult},
    models::{LineItem, Order},
    response::{ApiResponse, Meta},
    services::{
        cart_service, draft_service,
        order_service::{self, ConsumedSource, PlacementLine},
    },
    state::AppState,
};

/// Where a checkout's lines came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Cart(Uuid),
    Draft(Uuid),
}

#[derive(Debug, Clone)]
pub struct CheckoutSelection {
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub source: Option<LineSource>,
}

impl CheckoutSelection {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Decimal::new(0, 2),
            total: Decimal::new(0, 2),
            source: None,
        }
    }

    pub fn cart_id(&self) -> Option<Uuid> {
        match self.source {
            Some(LineSource::Cart(id)) => Some(id),
            _ => None,
        }
    }

    pub fn draft_id(&self) -> Option<Uuid> {
        match self.source {
            Some(LineSource::Draft(id)) => Some(id),
            _ => None,
        }
    }

    pub fn summary(&self) -> CheckoutSummary {
        CheckoutSummary {
            items: self.items.clone(),
            subtotal: self.subtotal,
            total: self.total,
            cart_id: self.cart_id(),
            draft_id: self.draft_id(),
        }
    }

    /// The exact lines a placement will delete once the order commits.
    pub fn consumed(&self) -> ConsumedSource {
        let ids = self.items.iter().map(|i| i.id).collect();
        match self.source {
            Some(LineSource::Cart(_)) => ConsumedSource::CartLines(ids),
            Some(LineSource::Draft(_)) => ConsumedSource::DraftLines(ids),
            None => ConsumedSource::Nothing,
        }
    }
}

/// Pick the lines for a checkout: a named draft first, then the session's
/// buy-now draft, then the owner's cart. An empty draft never wins, so a
/// stale buy-now flag falls through to the cart.
pub async fn reconcile<C>(
    conn: &C,
    owner: Option<&Owner>,
    session: &CheckoutSession,
    named_draft: Option<Uuid>,
) -> AppResult<CheckoutSelection>
where
    C: ConnectionTrait,
{
    let Some(owner) = owner else {
        return Ok(CheckoutSelection::empty());
    };

    for draft_id in [named_draft, session.buy_now_draft()].into_iter().flatten() {
        let view = draft_service::draft_view(conn, owner, draft_id).await?;
        if view.mode == CheckoutMode::BuyNow && !view.items.is_empty() {
            return Ok(CheckoutSelection {
                items: view.items,
                subtotal: view.subtotal,
                total: view.total,
                source: Some(LineSource::Draft(draft_id)),
            });
        }
    }

    let cart = cart_service::cart_summary(conn, owner).await?;
    Ok(CheckoutSelection {
        source: cart.cart_id.map(LineSource::Cart),
        items: cart.items,
        subtotal: cart.subtotal,
        total: cart.total,
    })
}

pub async fn get_checkout_summary(
    state: &AppState,
    owner: Option<&Owner>,
    session: &CheckoutSession,
    named_draft: Option<Uuid>,
) -> AppResult<ApiResponse<CheckoutSummary>> {
    let selection = reconcile(&state.orm, owner, session, named_draft).await?;
    Ok(ApiResponse::success(
        "OK",
        selection.summary(),
        Some(Meta::empty()),
    ))
}

/// Place an order from whatever the checkout currently points at.
pub async fn confirm_checkout(
    state: &AppState,
    owner: Option<&Owner>,
    session: &CheckoutSession,
    form: ConfirmCheckoutForm,
) -> AppResult<Order> {
    let Some(owner) = owner else {
        return Err(AppError::EmptyCart);
    };
    let selection = reconcile(&state.orm, Some(owner), session, form.named_draft()).await?;
    let lines = selection
        .items
        .iter()
        .map(PlacementLine::from_snapshot)
        .collect();
    order_service::place_order(state, owner, form.shipping, lines, selection.consumed()).await
}
