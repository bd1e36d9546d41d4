use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    domain::money,
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .map(product_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product, Some(Meta::empty())))
}

/// Load a product that can be put in a cart or draft right now.
pub async fn require_available<C>(conn: &C, id: Uuid) -> AppResult<ProductModel>
where
    C: ConnectionTrait,
{
    Products::find_by_id(id)
        .one(conn)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::ProductUnavailable(id))
}

/// Load every referenced product in one query, keyed by id.
pub async fn load_products<C>(conn: &C, ids: &[Uuid]) -> AppResult<HashMap<Uuid, ProductModel>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products = Products::find()
        .filter(ProdCol::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        image: model.image,
        price: money::from_minor(model.price),
        stock: model.stock,
        is_active: model.is_active,
    }
}
