mod common;

use serde_json::json;
use storefront_checkout::{
    domain::{CheckoutMode, CheckoutSession},
    dto::{cart::AddToCartRequest, checkout::BuyNowRequest},
    error::AppError,
    services::{cart_service, draft_service},
};
use tokio::task::JoinSet;
use uuid::Uuid;

fn buy_now(product_id: Uuid, size: &str, qty: i64) -> BuyNowRequest {
    serde_json::from_value(json!({ "productId": product_id, "size": size, "qty": qty }))
        .expect("valid buy-now request")
}

fn buy_now_session(draft_id: Uuid) -> CheckoutSession {
    CheckoutSession {
        guest_id: None,
        mode: CheckoutMode::BuyNow,
        draft_id: Some(draft_id),
    }
}

#[tokio::test]
async fn a_new_buy_now_replaces_the_previous_line() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;
    let mug = common::seed_product(&state, "Mug", 1200, 10).await?;

    let first = draft_service::create_draft(&state, &owner, buy_now(tee, "M", 2)).await?;
    let second = draft_service::create_draft(&state, &owner, buy_now(mug, "l", 1)).await?;
    let first_id = first.data.unwrap().draft_id;
    let draft_id = second.data.unwrap().draft_id;
    assert_eq!(first_id, draft_id, "one draft row per owner");

    let lines = draft_service::draft_lines(&state.orm, draft_id).await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, mug);
    assert_eq!(lines[0].qty, 1);
    Ok(())
}

#[tokio::test]
async fn buy_now_leaves_the_cart_alone() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;

    let add: AddToCartRequest =
        serde_json::from_value(json!({ "productId": tee, "size": "S", "qty": 3 }))?;
    cart_service::add_to_cart(&state, &owner, add).await?;
    draft_service::create_draft(&state, &owner, buy_now(tee, "M", 1)).await?;

    let cart = cart_service::cart_summary(&state.orm, &owner).await?;
    assert_eq!(cart.item_count, 3);
    Ok(())
}

#[tokio::test]
async fn get_draft_reports_buy_now_only_for_a_live_session() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;

    let created = draft_service::create_draft(&state, &owner, buy_now(tee, "M", 2)).await?;
    let draft_id = created.data.unwrap().draft_id;

    let view = draft_service::get_draft(&state, Some(&owner), &buy_now_session(draft_id))
        .await?
        .data
        .unwrap();
    assert_eq!(view.mode, CheckoutMode::BuyNow);
    assert_eq!(view.draft_id, Some(draft_id));
    assert_eq!(view.subtotal.to_string(), "50.00");

    let cart_session = CheckoutSession {
        draft_id: Some(draft_id),
        ..CheckoutSession::default()
    };
    let view = draft_service::get_draft(&state, Some(&owner), &cart_session)
        .await?
        .data
        .unwrap();
    assert_eq!(view.mode, CheckoutMode::Cart);
    assert!(view.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn foreign_drafts_read_as_cart_mode() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let stranger = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;

    let created = draft_service::create_draft(&state, &owner, buy_now(tee, "M", 1)).await?;
    let draft_id = created.data.unwrap().draft_id;

    let view = draft_service::get_draft_by_id(&state, Some(&stranger), draft_id)
        .await?
        .data
        .unwrap();
    assert_eq!(view.mode, CheckoutMode::Cart);

    let view = draft_service::get_draft_by_id(&state, None, draft_id)
        .await?
        .data
        .unwrap();
    assert_eq!(view.mode, CheckoutMode::Cart);

    let err = draft_service::clear_draft(&state, &stranger, draft_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn clearing_keeps_the_draft_id_valid() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;

    let created = draft_service::create_draft(&state, &owner, buy_now(tee, "M", 1)).await?;
    let draft_id = created.data.unwrap().draft_id;

    let cleared = draft_service::clear_draft(&state, &owner, draft_id).await?;
    assert_eq!(cleared.data.unwrap().mode, CheckoutMode::Cart);
    assert!(draft_service::draft_lines(&state.orm, draft_id).await?.is_empty());

    let again = draft_service::create_draft(&state, &owner, buy_now(tee, "S", 1)).await?;
    assert_eq!(again.data.unwrap().draft_id, draft_id);
    Ok(())
}

#[tokio::test]
async fn buy_now_validates_like_the_cart() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;
    let retired = common::seed_product_with(&state, "Retired", 2500, 10, false).await?;

    let err = draft_service::create_draft(&state, &owner, buy_now(tee, "huge", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSize(_)));

    let err = draft_service::create_draft(&state, &owner, buy_now(retired, "M", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductUnavailable(_)));
    Ok(())
}

#[tokio::test]
async fn concurrent_buy_now_calls_leave_one_line() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let owner = common::guest();
    let tee = common::seed_product(&state, "Tee", 2500, 10).await?;
    let mug = common::seed_product(&state, "Mug", 1200, 10).await?;

    let mut tasks = JoinSet::new();
    for (product_id, size) in [(tee, "S"), (mug, "M"), (tee, "L"), (mug, "XL")] {
        let state = state.clone();
        let owner = owner.clone();
        tasks.spawn(async move {
            draft_service::create_draft(&state, &owner, buy_now(product_id, size, 1)).await
        });
    }

    let mut draft_ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        draft_ids.push(joined??.data.unwrap().draft_id);
    }
    draft_ids.dedup();
    assert_eq!(draft_ids.len(), 1, "one draft row per owner");

    let lines = draft_service::draft_lines(&state.orm, draft_ids[0]).await?;
    assert_eq!(lines.len(), 1);
    Ok(())
}
