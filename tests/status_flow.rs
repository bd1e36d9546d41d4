mod common;

use serde_json::json;
use storefront_checkout::{
    domain::OrderStatus,
    dto::orders::{PlaceOrderRequest, UpdateOrderStatusRequest},
    error::AppError,
    models::Order,
    routes::params::OrderListQuery,
    services::{admin_service, order_service},
    state::AppState,
};
use uuid::Uuid;

async fn place(state: &AppState, product_id: Uuid, qty: i64) -> anyhow::Result<Order> {
    let payload: PlaceOrderRequest = serde_json::from_value(json!({
        "items": [{ "productId": product_id, "size": "M", "qty": qty }],
        "shipping": common::shipping(),
    }))?;
    let order = order_service::place_direct_order(state, &common::customer(), payload)
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order in response"))?;
    Ok(order)
}

fn set_to(status: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: status.into(),
    }
}

#[tokio::test]
async fn advance_walks_to_shipped_and_stops() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::admin();
    let tee = common::seed_product(&state, "Tee", 1000, 10).await?;
    let order = place(&state, tee, 1).await?;

    let mut seen = Vec::new();
    for _ in 0..3 {
        let resp = admin_service::advance_order_status(&state, &admin, order.id).await?;
        seen.push(resp.data.unwrap().status);
    }
    assert_eq!(
        seen,
        vec![OrderStatus::Shipping, OrderStatus::Shipped, OrderStatus::Shipped]
    );
    assert_eq!(common::stock_of(&state, tee).await?, 9);
    Ok(())
}

#[tokio::test]
async fn cancelling_returns_stock_once() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::admin();
    let tee = common::seed_product(&state, "Tee", 1000, 10).await?;
    let order = place(&state, tee, 4).await?;
    assert_eq!(common::stock_of(&state, tee).await?, 6);

    let cancelled = admin_service::update_order_status(&state, &admin, order.id, set_to("Cancelled"))
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(common::stock_of(&state, tee).await?, 10);

    // Repeating the cancel, or advancing a cancelled order, is a no-op.
    admin_service::update_order_status(&state, &admin, order.id, set_to("cancelled")).await?;
    let still = admin_service::advance_order_status(&state, &admin, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(still.status, OrderStatus::Cancelled);
    assert_eq!(common::stock_of(&state, tee).await?, 10);
    Ok(())
}

#[tokio::test]
async fn reopening_a_cancelled_order_needs_stock() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::admin();
    let tee = common::seed_product(&state, "Tee", 1000, 2).await?;
    let order = place(&state, tee, 2).await?;
    admin_service::update_order_status(&state, &admin, order.id, set_to("cancelled")).await?;

    // Someone else buys the returned units.
    place(&state, tee, 1).await?;

    let err = admin_service::update_order_status(&state, &admin, order.id, set_to("preparing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    let unchanged = admin_service::get_order_admin(&state, &admin, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Cancelled);
    assert_eq!(common::stock_of(&state, tee).await?, 1);
    Ok(())
}

#[tokio::test]
async fn unknown_statuses_and_orders_are_rejected() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::admin();
    let tee = common::seed_product(&state, "Tee", 1000, 10).await?;
    let order = place(&state, tee, 1).await?;

    let err = admin_service::update_order_status(&state, &admin, order.id, set_to("lost"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStatus(_)));

    let err = admin_service::advance_order_status(&state, &admin, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn status_changes_touch_only_status_and_timestamp() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let admin = common::admin();
    let tee = common::seed_product(&state, "Tee", 1000, 10).await?;
    let order = place(&state, tee, 3).await?;

    let shipped = admin_service::update_order_status(&state, &admin, order.id, set_to("shipped"))
        .await?
        .data
        .unwrap();
    assert_eq!(shipped.subtotal, order.subtotal);
    assert_eq!(shipped.shipping, order.shipping);
    assert_eq!(shipped.items.len(), order.items.len());
    assert_eq!(shipped.created_at, order.created_at);
    assert!(shipped.updated_at >= order.updated_at);
    Ok(())
}

#[tokio::test]
async fn admin_endpoints_require_the_admin_role() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let customer = common::customer();
    let tee = common::seed_product(&state, "Tee", 1000, 10).await?;
    let order = place(&state, tee, 1).await?;

    let err = admin_service::advance_order_status(&state, &customer, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    let err = admin_service::list_all_orders(&state, &customer, OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let all = admin_service::list_all_orders(&state, &common::admin(), OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(all.orders.len(), 1);
    Ok(())
}
