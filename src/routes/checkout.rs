use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::checkout::{BuyNowRequest, BuyNowResult, CheckoutSummary, ConfirmCheckoutForm},
    error::AppResult,
    middleware::{identity::RequestIdentity, session::SessionUpdate},
    models::DraftView,
    response::{ApiResponse, Meta},
    services::{checkout_service, draft_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout_summary))
        .route("/buy-now", post(buy_now))
        .route("/draft", get(get_draft).delete(clear_draft))
        .route("/draft/{id}", get(get_draft_by_id))
        .route("/confirm", post(confirm))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutQuery {
    /// Explicit draft to check out, as carried by the checkout page link.
    #[serde(default, alias = "orderId", alias = "draftId")]
    pub draft_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/checkout/buy-now",
    request_body = BuyNowRequest,
    responses(
        (status = 200, description = "Single-item draft created, buy-now cookies set", body = ApiResponse<BuyNowResult>),
        (status = 400, description = "Invalid size"),
        (status = 409, description = "Product unavailable")
    ),
    tag = "Checkout"
)]
pub async fn buy_now(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<BuyNowRequest>,
) -> AppResult<(SessionUpdate, Json<ApiResponse<BuyNowResult>>)> {
    let (owner, update) = identity.owner_for_write();
    let resp = draft_service::create_draft(&state, &owner, payload).await?;
    let update = match resp.data.as_ref() {
        Some(result) => update.start_buy_now(result.draft_id),
        None => update,
    };
    Ok((update, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/checkout/draft",
    responses(
        (status = 200, description = "Session draft, or cart mode", body = ApiResponse<DraftView>)
    ),
    tag = "Checkout"
)]
pub async fn get_draft(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<DraftView>>> {
    let owner = identity.owner();
    let resp = draft_service::get_draft(&state, owner.as_ref(), &identity.session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/checkout/draft/{id}",
    params(("id" = Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Named draft, or cart mode", body = ApiResponse<DraftView>)
    ),
    tag = "Checkout"
)]
pub async fn get_draft_by_id(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DraftView>>> {
    let owner = identity.owner();
    let resp = draft_service::get_draft_by_id(&state, owner.as_ref(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/checkout/draft",
    responses(
        (status = 200, description = "Draft emptied, buy-now cookies cleared", body = ApiResponse<DraftView>),
        (status = 404, description = "Draft not owned by caller")
    ),
    tag = "Checkout"
)]
pub async fn clear_draft(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<(SessionUpdate, Json<ApiResponse<DraftView>>)> {
    let update = identity.session_update().end_buy_now();
    let resp = match (identity.owner(), identity.session.draft_id) {
        (Some(owner), Some(draft_id)) => {
            draft_service::clear_draft(&state, &owner, draft_id).await?
        }
        _ => ApiResponse::success(
            "Draft cleared",
            draft_service::cart_mode_view(),
            Some(Meta::empty()),
        ),
    };
    Ok((update, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/checkout",
    params(("draftId" = Option<Uuid>, Query, description = "Draft to check out instead of the session's")),
    responses(
        (status = 200, description = "Lines the next confirmation would consume", body = ApiResponse<CheckoutSummary>)
    ),
    tag = "Checkout"
)]
pub async fn checkout_summary(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Query(query): Query<CheckoutQuery>,
) -> AppResult<Json<ApiResponse<CheckoutSummary>>> {
    let owner = identity.owner();
    let resp = checkout_service::get_checkout_summary(
        &state,
        owner.as_ref(),
        &identity.session,
        query.draft_id,
    )
    .await?;
    Ok(Json(resp))
}

/// Form post from the checkout page. Always answers with a redirect; failures
/// carry only a coarse flag.
#[utoipa::path(
    post,
    path = "/api/checkout/confirm",
    request_body(content = ConfirmCheckoutForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /checkout/success?orderId=... or /checkout?error=empty|shipping|stock|failed")
    ),
    tag = "Checkout"
)]
pub async fn confirm(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Form(form): Form<ConfirmCheckoutForm>,
) -> (SessionUpdate, Redirect) {
    let owner = identity.owner();
    match checkout_service::confirm_checkout(&state, owner.as_ref(), &identity.session, form).await
    {
        Ok(order) => (
            identity.session_update().end_buy_now(),
            Redirect::to(&format!("/checkout/success?orderId={}", order.id)),
        ),
        Err(err) => {
            let flag = err.checkout_flag();
            if flag == "failed" {
                tracing::error!(error = %err, "checkout confirmation failed");
            } else {
                tracing::debug!(error = %err, flag, "checkout rejected");
            }
            (
                identity.session_update(),
                Redirect::to(&format!("/checkout?error={flag}")),
            )
        }
    }
}
