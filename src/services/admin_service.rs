use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{OrderStatus, Owner},
    dto::orders::{OrderList, UpdateOrderStatusRequest},
    entity::orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let orders = order_service::orders_with_items(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = order_service::load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Order found",
        order_service::order_from_entity(order, items)?,
        Some(Meta::empty()),
    ))
}

/// Set an order's status to any of the known values.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next: OrderStatus = payload.status.parse()?;
    let order = transition(state, user, id, |_| next).await?;
    Ok(ApiResponse::success("Order updated", order, Some(Meta::empty())))
}

/// Move an order one step along preparing, shipping, shipped. Shipped and
/// cancelled orders are returned unchanged.
pub async fn advance_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let order = transition(state, user, id, OrderStatus::advance).await?;
    Ok(ApiResponse::success("Order updated", order, Some(Meta::empty())))
}

/// Apply a status change under a row lock so concurrent admins serialize.
/// Only `status` and `updated_at` are written; entering or leaving
/// `cancelled` moves the order's units back into or out of inventory.
#[tracing::instrument(skip(state, user, next_of), fields(admin = %user.user_id))]
async fn transition<F>(state: &AppState, user: &AuthUser, id: Uuid, next_of: F) -> AppResult<Order>
where
    F: FnOnce(OrderStatus) -> OrderStatus,
{
    let txn = state.orm.begin().await?;

    let Some(existing) = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        txn.rollback().await?;
        return Err(AppError::NotFound);
    };

    let current: OrderStatus = existing.status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has status {:?}",
            existing.id,
            existing.status
        ))
    })?;
    let next = next_of(current);

    if next == current {
        let items = order_service::load_items(&txn, existing.id).await?;
        txn.commit().await?;
        return order_service::order_from_entity(existing, items);
    }

    if let Some(restock) = current.stock_effect(next)
        && let Err(err) = move_stock(&txn, &existing, restock).await
    {
        txn.rollback().await?;
        return Err(err);
    }

    Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(next.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(OrderCol::Id.eq(existing.id))
        .exec(&txn)
        .await?;

    let order = Orders::find_by_id(existing.id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = order_service::load_items(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status changed");
    audit::record(
        &state.orm,
        Some(&Owner::User(user.user_id)),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    order_service::order_from_entity(order, items)
}

async fn move_stock(txn: &DatabaseTransaction, order: &OrderModel, restock: bool) -> AppResult<()> {
    let items = order_service::load_items(txn, order.id).await?;
    let mut units: BTreeMap<Uuid, i64> = BTreeMap::new();
    for item in &items {
        *units.entry(item.product_id).or_default() += i64::from(item.qty);
    }

    for (product_id, qty) in units {
        if restock {
            order_service::return_stock(txn, product_id, qty).await?;
        } else if !order_service::take_stock(txn, product_id, qty).await? {
            let name = items
                .iter()
                .find(|i| i.product_id == product_id)
                .map(|i| i.name.clone())
                .unwrap_or_default();
            return Err(AppError::InsufficientStock { product_id, name });
        }
    }
    Ok(())
}
