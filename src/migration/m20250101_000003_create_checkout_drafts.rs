use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_products::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckoutDrafts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckoutDrafts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckoutDrafts::UserId).uuid().unique_key())
                    .col(ColumnDef::new(CheckoutDrafts::GuestId).string().unique_key())
                    .col(
                        ColumnDef::new(CheckoutDrafts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckoutDrafts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CheckoutDraftItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckoutDraftItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckoutDraftItems::DraftId).uuid().not_null())
                    .col(
                        ColumnDef::new(CheckoutDraftItems::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CheckoutDraftItems::Name).string().not_null())
                    .col(ColumnDef::new(CheckoutDraftItems::Image).string())
                    .col(ColumnDef::new(CheckoutDraftItems::Qty).integer().not_null())
                    .col(
                        ColumnDef::new(CheckoutDraftItems::Size)
                            .string_len(2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckoutDraftItems::UnitPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckoutDraftItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(CheckoutDraftItems::Qty).gte(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkout_draft_items_draft")
                            .from(CheckoutDraftItems::Table, CheckoutDraftItems::DraftId)
                            .to(CheckoutDrafts::Table, CheckoutDrafts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkout_draft_items_product")
                            .from(CheckoutDraftItems::Table, CheckoutDraftItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckoutDraftItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CheckoutDrafts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CheckoutDrafts {
    Table,
    Id,
    UserId,
    GuestId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CheckoutDraftItems {
    Table,
    Id,
    DraftId,
    ProductId,
    Name,
    Image,
    Qty,
    Size,
    UnitPrice,
    CreatedAt,
}
