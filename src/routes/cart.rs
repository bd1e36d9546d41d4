use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, AddToCartResult, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::{identity::RequestIdentity, session::SessionUpdate},
    models::{CartSummary, LineItem},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_summary).delete(clear_cart))
        .route("/add", post(add_to_cart))
        .route("/items/{id}", patch(update_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart of the current user or guest", body = ApiResponse<CartSummary>)
    ),
    tag = "Cart"
)]
pub async fn cart_summary(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::get_summary(&state, identity.owner().as_ref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line added or merged", body = ApiResponse<AddToCartResult>),
        (status = 400, description = "Invalid size"),
        (status = 409, description = "Product unavailable")
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<(SessionUpdate, Json<ApiResponse<AddToCartResult>>)> {
    let (owner, update) = identity.owner_for_write();
    let resp = cart_service::add_to_cart(&state, &owner, payload).await?;
    Ok((update, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart line ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity replaced", body = ApiResponse<LineItem>),
        (status = 404, description = "Not in this cart")
    ),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<LineItem>>> {
    let owner = identity.owner().ok_or(AppError::NotFound)?;
    let resp = cart_service::update_item_qty(&state, &owner, id, payload.qty).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart line ID")),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartSummary>),
        (status = 404, description = "Not in this cart")
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let owner = identity.owner().ok_or(AppError::NotFound)?;
    let resp = cart_service::remove_item(&state, &owner, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartSummary>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = match identity.owner() {
        Some(owner) => cart_service::clear_cart(&state, &owner).await?,
        None => cart_service::get_summary(&state, None).await?,
    };
    Ok(Json(resp))
}
