use chrono::Utc;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use storefront_checkout::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, 1).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let created = seed_products(&orm).await?;

    println!("Seed completed. {created} new products");
    Ok(())
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<usize> {
    // (name, image, price in minor units, stock)
    let products = [
        ("Ferris Tee", Some("/img/ferris-tee.png"), 2500, 40),
        ("Async Hoodie", Some("/img/async-hoodie.png"), 5500, 25),
        ("Borrow Checker Cap", None, 1800, 60),
        ("Lifetime Socks", Some("/img/lifetime-socks.png"), 900, 100),
    ];

    let mut created = 0;
    for (name, image, price, stock) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now();
        Products::insert(ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            image: Set(image.map(str::to_string)),
            price: Set(price),
            stock: Set(stock),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .exec_without_returning(orm)
        .await?;
        println!("Seeded {name}");
        created += 1;
    }

    Ok(created)
}
