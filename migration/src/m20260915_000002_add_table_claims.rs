use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Tables {
    Table,
    ActiveOrderId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    DeviceToken,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 桌台占用改为条件写入：tables.active_order_id 为 NULL 时才允许下单占用
/// 同时为推送通知保存设备 token
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Tables::Table)
                    .add_column(ColumnDef::new(Tables::ActiveOrderId).big_integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .add_column(ColumnDef::new(Users::DeviceToken).string_len(512).null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .drop_column(Users::DeviceToken)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Tables::Table)
                    .drop_column(Tables::ActiveOrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
