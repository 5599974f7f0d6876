use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    PasswordHash,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Price,
    Stock,
    Category,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tables {
    Table,
    Id,
    Label,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderCode,
    TableLabel,
    CustomerName,
    UserId,
    SubTotal,
    UniqueCode,
    Total,
    PaymentMethod,
    PaymentProofUrl,
    Note,
    Status,
    PaymentStatus,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    UnitPrice,
    Quantity,
    Note,
    Category,
}

/// 门店配置（单行）
#[derive(DeriveIden)]
enum StoreSettings {
    Table,
    Id,
    Latitude,
    Longitude,
    RadiusKm,
    Polygon,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表（顾客与员工共用，角色单独存储）
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Users::DisplayName).string_len(100).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(20)
                            .not_null()
                            .default("user"),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email_unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 商品表
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Products::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Products::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Products::Category).string_len(100).not_null())
                    .col(ColumnDef::new(Products::ImageUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 桌台表
        manager
            .create_table(
                Table::create()
                    .table(Tables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tables::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tables::Label).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Tables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tables_label_unique")
                    .table(Tables::Table)
                    .col(Tables::Label)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 订单表
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderCode).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::TableLabel).string_len(50).not_null())
                    .col(ColumnDef::new(Orders::CustomerName).string_len(100).not_null())
                    .col(ColumnDef::new(Orders::UserId).big_integer().null())
                    .col(ColumnDef::new(Orders::SubTotal).big_integer().not_null())
                    .col(ColumnDef::new(Orders::UniqueCode).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Total).big_integer().not_null())
                    .col(ColumnDef::new(Orders::PaymentMethod).string_len(20).not_null())
                    .col(ColumnDef::new(Orders::PaymentProofUrl).string_len(1024).null())
                    .col(ColumnDef::new(Orders::Note).string_len(500).null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_order_code_unique")
                    .table(Orders::Table)
                    .col(Orders::OrderCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 按桌台 + 状态查询（占用检查）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_table_status")
                    .table(Orders::Table)
                    .col(Orders::TableLabel)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        // 订单明细
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::ProductName).string_len(255).not_null())
                    .col(ColumnDef::new(OrderItems::UnitPrice).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(OrderItems::Note).string_len(500).null())
                    .col(ColumnDef::new(OrderItems::Category).string_len(100).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        // 门店定位配置，polygon 以 JSON 文本保存
        manager
            .create_table(
                Table::create()
                    .table(StoreSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoreSettings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoreSettings::Latitude).double().not_null())
                    .col(ColumnDef::new(StoreSettings::Longitude).double().not_null())
                    .col(ColumnDef::new(StoreSettings::RadiusKm).double().null())
                    .col(ColumnDef::new(StoreSettings::Polygon).text().null())
                    .col(
                        ColumnDef::new(StoreSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：明细 -> 订单 -> 其它
        manager
            .drop_table(Table::drop().if_exists().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(StoreSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Tables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
