use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
    sea_query::{Alias, Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Owner, Quantity, Size, money},
    dto::cart::{AddToCartRequest, AddToCartResult},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
    models::{CartSummary, LineItem},
    response::{ApiResponse, Meta},
    services::catalog_service,
    state::AppState,
};

pub async fn get_summary(
    state: &AppState,
    owner: Option<&Owner>,
) -> AppResult<ApiResponse<CartSummary>> {
    let summary = match owner {
        Some(owner) => cart_summary(&state.orm, owner).await?,
        None => empty_summary(),
    };
    Ok(ApiResponse::success("OK", summary, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    owner: &Owner,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<AddToCartResult>> {
    let size = Size::normalize(&payload.size)?;
    let qty = payload.qty.get();
    let product = catalog_service::require_available(&state.orm, payload.product_id).await?;

    let cart = ensure_cart(&state.orm, owner).await?;

    let line = CartItemActive {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart.id),
        product_id: Set(product.id),
        name: Set(product.name.clone()),
        image: Set(product.image.clone()),
        qty: Set(qty),
        size: Set(size.as_str().to_owned()),
        unit_price: Set(product.price),
        created_at: Set(Utc::now().into()),
    };

    // Keyed on (cart, product, size): concurrent adds land on one row.
    let merged = Expr::col((CartItems, CartItemCol::Qty))
        .add(Expr::col((Alias::new("excluded"), CartItemCol::Qty)));
    let cap = Quantity::MAX.get();
    CartItems::insert(line)
        .on_conflict(
            OnConflict::columns([CartItemCol::CartId, CartItemCol::ProductId, CartItemCol::Size])
                .value(
                    CartItemCol::Qty,
                    Expr::case(Expr::expr(merged.clone()).gt(cap), cap).finally(merged),
                )
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    let item = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::CartId.eq(cart.id))
                .add(CartItemCol::ProductId.eq(product.id))
                .add(CartItemCol::Size.eq(size.as_str())),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart line vanished after upsert")))?;

    let summary = cart_summary(&state.orm, owner).await?;

    audit::record(
        &state.orm,
        Some(owner),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "size": size, "qty": qty }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to cart",
        AddToCartResult {
            ok: true,
            item: line_from_cart_item(item)?,
            item_count: summary.item_count,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_item_qty(
    state: &AppState,
    owner: &Owner,
    item_id: Uuid,
    qty: Quantity,
) -> AppResult<ApiResponse<LineItem>> {
    let cart = find_cart(&state.orm, owner).await?.ok_or(AppError::NotFound)?;

    let result = CartItems::update_many()
        .col_expr(CartItemCol::Qty, Expr::value(qty.get()))
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let item = CartItems::find_by_id(item_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Cart updated",
        line_from_cart_item(item)?,
        Some(Meta::empty()),
    ))
}

pub async fn remove_item(
    state: &AppState,
    owner: &Owner,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartSummary>> {
    let cart = find_cart(&state.orm, owner).await?.ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(owner),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "item_id": item_id }),
    )
    .await;

    let summary = cart_summary(&state.orm, owner).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        summary,
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(state: &AppState, owner: &Owner) -> AppResult<ApiResponse<CartSummary>> {
    if let Some(cart) = find_cart(&state.orm, owner).await? {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&state.orm)
            .await?;
    }
    let summary = cart_summary(&state.orm, owner).await?;
    Ok(ApiResponse::success("Cart cleared", summary, Some(Meta::empty())))
}

/// Side-effect-free view of the owner's cart.
pub async fn cart_summary<C>(conn: &C, owner: &Owner) -> AppResult<CartSummary>
where
    C: ConnectionTrait,
{
    let Some(cart) = find_cart(conn, owner).await? else {
        return Ok(empty_summary());
    };

    let items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(line_from_cart_item)
        .collect::<AppResult<Vec<_>>>()?;

    let subtotal = subtotal(&items)?;
    Ok(CartSummary {
        cart_id: Some(cart.id),
        item_count: items.iter().map(|i| i64::from(i.qty)).sum(),
        items,
        subtotal,
        total: subtotal,
    })
}

pub async fn find_cart<C>(conn: &C, owner: &Owner) -> AppResult<Option<CartModel>>
where
    C: ConnectionTrait,
{
    let cart = Carts::find()
        .filter(owner_condition(owner))
        .one(conn)
        .await?;
    Ok(cart)
}

/// Return the owner's cart, creating it on first use. Racing creators are
/// settled by the unique owner column.
pub async fn ensure_cart<C>(conn: &C, owner: &Owner) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    if let Some(cart) = find_cart(conn, owner).await? {
        return Ok(cart);
    }

    let now = Utc::now();
    let conflict_col = match owner {
        Owner::User(_) => CartCol::UserId,
        Owner::Guest(_) => CartCol::GuestId,
    };
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.user_id()),
        guest_id: Set(owner.guest_id().map(str::to_owned)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(OnConflict::column(conflict_col).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    find_cart(conn, owner)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart upsert returned no row")))
}

fn owner_condition(owner: &Owner) -> Condition {
    match owner {
        Owner::User(id) => Condition::all().add(CartCol::UserId.eq(*id)),
        Owner::Guest(id) => Condition::all().add(CartCol::GuestId.eq(id.as_str())),
    }
}

fn empty_summary() -> CartSummary {
    CartSummary {
        cart_id: None,
        items: Vec::new(),
        subtotal: money::from_minor(0),
        total: money::from_minor(0),
        item_count: 0,
    }
}

pub fn subtotal(items: &[LineItem]) -> AppResult<Decimal> {
    money::sum(items.iter().map(|i| i.line_total))
}

/// Build a priced line from stored snapshot columns.
pub fn line_item(
    id: Uuid,
    product_id: Uuid,
    name: String,
    image: Option<String>,
    size: &str,
    qty: i32,
    unit_price_minor: i64,
) -> AppResult<LineItem> {
    let size = Size::normalize(size)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("stored line {id} has size {size:?}")))?;
    let unit_price = money::from_minor(unit_price_minor);
    Ok(LineItem {
        id,
        product_id,
        name,
        image,
        size,
        qty,
        unit_price,
        line_total: money::line_total(unit_price, qty)?,
    })
}

fn line_from_cart_item(model: CartItemModel) -> AppResult<LineItem> {
    line_item(
        model.id,
        model.product_id,
        model.name,
        model.image,
        &model.size,
        model.qty,
        model.unit_price,
    )
}
