use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{LockType, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{CheckoutMode, CheckoutSession, Owner, Size, money},
    dto::checkout::{BuyNowRequest, BuyNowResult},
    entity::{
        checkout_draft_items::{
            ActiveModel as DraftItemActive, Column as DraftItemCol, Entity as DraftItems,
            Model as DraftItemModel,
        },
        checkout_drafts::{
            ActiveModel as DraftActive, Column as DraftCol, Entity as Drafts, Model as DraftModel,
        },
    },
    error::{AppError, AppResult},
    models::{DraftView, LineItem},
    response::{ApiResponse, Meta},
    services::{cart_service, catalog_service},
    state::AppState,
};

/// Start a buy-now checkout. Any earlier draft lines of this owner are
/// discarded, so exactly one line remains.
pub async fn create_draft(
    state: &AppState,
    owner: &Owner,
    payload: BuyNowRequest,
) -> AppResult<ApiResponse<BuyNowResult>> {
    let size = Size::normalize(&payload.size)?;
    let qty = payload.qty.get();
    let product = catalog_service::require_available(&state.orm, payload.product_id).await?;

    let txn = state.orm.begin().await?;

    let draft = ensure_draft(&txn, owner).await?;

    DraftItems::delete_many()
        .filter(DraftItemCol::DraftId.eq(draft.id))
        .exec(&txn)
        .await?;

    DraftItemActive {
        id: Set(Uuid::new_v4()),
        draft_id: Set(draft.id),
        product_id: Set(product.id),
        name: Set(product.name.clone()),
        image: Set(product.image.clone()),
        qty: Set(qty),
        size: Set(size.as_str().to_owned()),
        unit_price: Set(product.price),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    let mut touched: DraftActive = draft.clone().into();
    touched.updated_at = Set(Utc::now().into());
    touched.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(owner),
        "buy_now",
        "checkout_drafts",
        serde_json::json!({ "draft_id": draft.id, "product_id": product.id, "qty": qty }),
    )
    .await;

    Ok(ApiResponse::success(
        "Draft created",
        BuyNowResult {
            ok: true,
            draft_id: draft.id,
        },
        Some(Meta::empty()),
    ))
}

/// The session's buy-now draft, or an empty `cart`-mode view telling the
/// caller to fall back to the cart.
pub async fn get_draft(
    state: &AppState,
    owner: Option<&Owner>,
    session: &CheckoutSession,
) -> AppResult<ApiResponse<DraftView>> {
    let view = match (owner, session.buy_now_draft()) {
        (Some(owner), Some(draft_id)) => draft_view(&state.orm, owner, draft_id).await?,
        _ => cart_mode_view(),
    };
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn get_draft_by_id(
    state: &AppState,
    owner: Option<&Owner>,
    draft_id: Uuid,
) -> AppResult<ApiResponse<DraftView>> {
    let view = match owner {
        Some(owner) => draft_view(&state.orm, owner, draft_id).await?,
        None => cart_mode_view(),
    };
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Empty the draft. The draft row itself stays so its id remains valid.
pub async fn clear_draft(
    state: &AppState,
    owner: &Owner,
    draft_id: Uuid,
) -> AppResult<ApiResponse<DraftView>> {
    let draft = Drafts::find_by_id(draft_id)
        .one(&state.orm)
        .await?
        .filter(|d| owner.owns(d.user_id, d.guest_id.as_deref()))
        .ok_or(AppError::NotFound)?;

    DraftItems::delete_many()
        .filter(DraftItemCol::DraftId.eq(draft.id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Draft cleared",
        cart_mode_view(),
        Some(Meta::empty()),
    ))
}

/// Resolve a draft id into a view, honoring ownership. A missing, foreign or
/// empty draft reads as cart mode.
pub async fn draft_view<C>(conn: &C, owner: &Owner, draft_id: Uuid) -> AppResult<DraftView>
where
    C: ConnectionTrait,
{
    let draft = Drafts::find_by_id(draft_id)
        .one(conn)
        .await?
        .filter(|d| owner.owns(d.user_id, d.guest_id.as_deref()));
    let Some(draft) = draft else {
        return Ok(cart_mode_view());
    };

    let items = draft_lines(conn, draft.id).await?;
    if items.is_empty() {
        return Ok(cart_mode_view());
    }

    let subtotal = cart_service::subtotal(&items)?;
    Ok(DraftView {
        mode: CheckoutMode::BuyNow,
        draft_id: Some(draft.id),
        items,
        subtotal,
        total: subtotal,
    })
}

pub async fn draft_lines<C>(conn: &C, draft_id: Uuid) -> AppResult<Vec<LineItem>>
where
    C: ConnectionTrait,
{
    DraftItems::find()
        .filter(DraftItemCol::DraftId.eq(draft_id))
        .order_by_asc(DraftItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(line_from_draft_item)
        .collect()
}

async fn ensure_draft<C>(conn: &C, owner: &Owner) -> AppResult<DraftModel>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let conflict_col = match owner {
        Owner::User(_) => DraftCol::UserId,
        Owner::Guest(_) => DraftCol::GuestId,
    };
    Drafts::insert(DraftActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.user_id()),
        guest_id: Set(owner.guest_id().map(str::to_owned)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(OnConflict::column(conflict_col).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    let condition = match owner {
        Owner::User(id) => Condition::all().add(DraftCol::UserId.eq(*id)),
        Owner::Guest(id) => Condition::all().add(DraftCol::GuestId.eq(id.as_str())),
    };
    // Serialize concurrent buy-now clicks of the same owner.
    Drafts::find()
        .filter(condition)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("draft upsert returned no row")))
}

pub fn cart_mode_view() -> DraftView {
    DraftView {
        mode: CheckoutMode::Cart,
        draft_id: None,
        items: Vec::new(),
        subtotal: money::from_minor(0),
        total: money::from_minor(0),
    }
}

fn line_from_draft_item(model: DraftItemModel) -> AppResult<LineItem> {
    cart_service::line_item(
        model.id,
        model.product_id,
        model.name,
        model.image,
        &model.size,
        model.qty,
        model.unit_price,
    )
}
