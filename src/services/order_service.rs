use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{OrderStatus, Owner, Quantity, Size, money},
    dto::orders::{OrderList, PlaceOrderRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        checkout_draft_items::{Column as DraftItemCol, Entity as DraftItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{LineItem, Order, OrderItem, ShippingInfo},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::catalog_service,
    state::AppState,
};

/// One requested line, before validation.
#[derive(Debug, Clone)]
pub struct PlacementLine {
    pub product_id: Uuid,
    pub size: String,
    pub qty: Quantity,
    pub snapshot: Option<LineSnapshot>,
}

/// Values captured when a line entered a cart or draft.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
}

impl PlacementLine {
    pub fn from_snapshot(line: &LineItem) -> Self {
        Self {
            product_id: line.product_id,
            size: line.size.as_str().to_owned(),
            qty: Quantity::new(i64::from(line.qty)),
            snapshot: Some(LineSnapshot {
                name: line.name.clone(),
                image: line.image.clone(),
                unit_price: line.unit_price,
            }),
        }
    }
}

/// Source lines to delete in the same transaction that creates the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumedSource {
    Nothing,
    CartLines(Vec<Uuid>),
    DraftLines(Vec<Uuid>),
}

/// Validate, reserve stock and create the order in one transaction.
///
/// Every precondition is checked before the first write. Inside the
/// transaction each product's stock is decremented with a conditional update
/// (`stock >= qty`) so a concurrent placement that got there first turns
/// into `InsufficientStock` instead of negative stock.
#[tracing::instrument(skip_all, fields(lines = lines.len()))]
pub async fn place_order(
    state: &AppState,
    owner: &Owner,
    shipping: ShippingInfo,
    lines: Vec<PlacementLine>,
    consumed: ConsumedSource,
) -> AppResult<Order> {
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let missing = shipping.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::IncompleteShipping(missing));
    }
    let shipping = shipping.trimmed();

    let mut normalized = Vec::with_capacity(lines.len());
    for line in lines {
        let size = Size::normalize(&line.size)?;
        normalized.push((line, size));
    }

    let mut product_ids: Vec<Uuid> = normalized.iter().map(|(l, _)| l.product_id).collect();
    product_ids.sort();
    product_ids.dedup();
    let products = catalog_service::load_products(&state.orm, &product_ids).await?;
    for id in &product_ids {
        match products.get(id) {
            None => return Err(AppError::ProductNotFound(*id)),
            Some(p) if !p.is_active => return Err(AppError::ProductUnavailable(*id)),
            Some(_) => {}
        }
    }

    // Ordered by product id so concurrent placements lock rows in the same order.
    let mut demand: BTreeMap<Uuid, i64> = BTreeMap::new();
    for (line, _) in &normalized {
        *demand.entry(line.product_id).or_default() += i64::from(line.qty.get());
    }
    for (id, qty) in &demand {
        let product = &products[id];
        if i64::from(product.stock) < *qty {
            return Err(AppError::InsufficientStock {
                product_id: *id,
                name: product.name.clone(),
            });
        }
    }

    let order_id = Uuid::new_v4();
    let mut item_rows = Vec::with_capacity(normalized.len());
    let mut line_totals = Vec::with_capacity(normalized.len());
    for (position, (line, size)) in normalized.into_iter().enumerate() {
        let product = &products[&line.product_id];
        let (name, image, unit_price) = match line.snapshot {
            Some(snap) => (snap.name, snap.image, snap.unit_price),
            None => (
                product.name.clone(),
                product.image.clone(),
                money::from_minor(product.price),
            ),
        };
        let qty = line.qty.get();
        line_totals.push(money::line_total(unit_price, qty)?);
        item_rows.push(OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            position: Set(position as i32),
            product_id: Set(line.product_id),
            name: Set(name),
            image: Set(image),
            qty: Set(qty),
            unit_price: Set(money::to_minor(unit_price)?),
            size: Set(size.as_str().to_owned()),
        });
    }
    let subtotal = money::sum(line_totals)?;
    let subtotal_minor = money::to_minor(subtotal)?;

    let txn = state.orm.begin().await?;

    for (id, qty) in &demand {
        if !take_stock(&txn, *id, *qty).await? {
            txn.rollback().await?;
            tracing::info!(product_id = %id, qty, "stock race lost during placement");
            return Err(AppError::InsufficientStock {
                product_id: *id,
                name: products[id].name.clone(),
            });
        }
    }

    let now = Utc::now();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(owner.user_id()),
        guest_id: Set(owner.guest_id().map(str::to_owned)),
        ship_name: Set(shipping.name),
        ship_email: Set(shipping.email),
        ship_phone: Set(shipping.phone),
        ship_address: Set(shipping.address),
        ship_city: Set(shipping.city),
        ship_country: Set(shipping.country),
        ship_postal_code: Set(shipping.postal_code),
        subtotal: Set(subtotal_minor),
        total: Set(subtotal_minor),
        status: Set(OrderStatus::Preparing.as_str().to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    OrderItems::insert_many(item_rows)
        .exec_without_returning(&txn)
        .await?;

    match &consumed {
        ConsumedSource::CartLines(ids) if !ids.is_empty() => {
            CartItems::delete_many()
                .filter(CartItemCol::Id.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
        }
        ConsumedSource::DraftLines(ids) if !ids.is_empty() => {
            DraftItems::delete_many()
                .filter(DraftItemCol::Id.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
        }
        _ => {}
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::Position)
        .all(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, subtotal = %subtotal, "order placed");
    audit::record(
        &state.orm,
        Some(owner),
        "order_placed",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": subtotal }),
    )
    .await;

    order_from_entity(order, items)
}

/// `POST /orders`: lines come straight from the request and are priced
/// from the catalog.
pub async fn place_direct_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let lines = payload
        .items
        .into_iter()
        .map(|item| PlacementLine {
            product_id: item.product_id,
            size: item.size,
            qty: item.qty,
            snapshot: None,
        })
        .collect();
    let owner = Owner::User(user.user_id);
    let order = place_order(
        state,
        &owner,
        payload.shipping,
        lines,
        ConsumedSource::Nothing,
    )
    .await?;
    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let orders = orders_with_items(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { orders },
        Some(Meta::new(page, limit, total)),
    ))
}

/// An order visible to `owner`; anything else is `NotFound`.
pub async fn get_order(state: &AppState, owner: &Owner, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|o| owner.owns(o.user_id, o.guest_id.as_deref()))
        .ok_or(AppError::NotFound)?;
    let items = load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success(
        "OK",
        order_from_entity(order, items)?,
        Some(Meta::empty()),
    ))
}

/// Conditionally take `qty` units. `false` means there were not enough.
pub async fn take_stock<C>(conn: &C, product_id: Uuid, qty: i64) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let Ok(qty) = i32::try_from(qty) else {
        return Ok(false);
    };
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(qty))
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Stock.gte(qty))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn return_stock<C>(conn: &C, product_id: Uuid, qty: i64) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let qty = i32::try_from(qty)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("restock of {qty} units overflows")))?;
    Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(qty))
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn load_items<C>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?;
    Ok(items)
}

/// Attach items to a page of orders with a single extra query.
pub async fn orders_with_items<C>(conn: &C, models: Vec<OrderModel>) -> AppResult<Vec<Order>>
where
    C: ConnectionTrait,
{
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|o| o.id).collect();
    let mut by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?
    {
        by_order.entry(item.order_id).or_default().push(item);
    }
    models
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            order_from_entity(order, items)
        })
        .collect()
}

pub fn order_from_entity(model: OrderModel, items: Vec<OrderItemModel>) -> AppResult<Order> {
    let status = model
        .status
        .parse::<OrderStatus>()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("order {} has status {:?}", model.id, model.status)))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        guest_id: model.guest_id,
        shipping: ShippingInfo {
            name: model.ship_name,
            email: model.ship_email,
            phone: model.ship_phone,
            address: model.ship_address,
            city: model.ship_city,
            country: model.ship_country,
            postal_code: model.ship_postal_code,
        },
        subtotal: money::from_minor(model.subtotal),
        total: money::from_minor(model.total),
        status,
        items: items
            .into_iter()
            .map(order_item_from_entity)
            .collect::<AppResult<_>>()?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> AppResult<OrderItem> {
    let size = Size::normalize(&model.size).map_err(|_| {
        AppError::Internal(anyhow::anyhow!("order item {} has size {:?}", model.id, model.size))
    })?;
    let unit_price = money::from_minor(model.unit_price);
    Ok(OrderItem {
        product_id: model.product_id,
        name: model.name,
        image: model.image,
        qty: model.qty,
        unit_price,
        size,
        line_total: money::line_total(unit_price, model.qty)?,
    })
}
