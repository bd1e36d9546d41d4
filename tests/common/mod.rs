#![allow(dead_code)]

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveValue::Set, EntityTrait};
use storefront_checkout::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    domain::Owner,
    dto::auth::Claims,
    entity::products::{ActiveModel as ProductActive, Entity as Products},
    middleware::auth::AuthUser,
    models::ShippingInfo,
    state::AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        db_max_connections: 1,
        cookie_secure: false,
        buy_now_ttl_minutes: 30,
    }
}

/// Fresh in-memory database with the schema applied. One pooled connection
/// keeps every query on the same in-memory database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let config = test_config();
    let orm = create_orm_conn(&config.database_url, 1).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, config))
}

pub async fn seed_product(
    state: &AppState,
    name: &str,
    price_minor: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    seed_product_with(state, name, price_minor, stock, true).await
}

pub async fn seed_product_with(
    state: &AppState,
    name: &str,
    price_minor: i64,
    stock: i32,
    is_active: bool,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    Products::insert(ProductActive {
        id: Set(id),
        name: Set(name.to_string()),
        image: Set(Some(format!("/img/{id}.png"))),
        price: Set(price_minor),
        stock: Set(stock),
        is_active: Set(is_active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .exec_without_returning(&state.orm)
    .await?;
    Ok(id)
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(product.stock)
}

pub fn guest() -> Owner {
    Owner::mint_guest()
}

pub fn customer() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

pub fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "555-0100".into(),
        address: "12 Analytical Row".into(),
        city: "London".into(),
        country: "UK".into(),
        postal_code: "N1 9GU".into(),
    }
}

pub fn token_for(user: &AuthUser) -> String {
    let claims = Claims {
        sub: user.user_id.to_string(),
        role: user.role.clone(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign token")
}
