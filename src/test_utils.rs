//! 测试辅助：内存 SQLite + 迁移 + 常用种子数据

use crate::entities::{Role, product_entity, table_entity, user_entity};
use crate::middlewares::CurrentUser;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};

/// 每个测试独立的内存库；单连接保证所有查询落在同一个库上
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<user_entity::Model, DbErr> {
    let now = Utc::now();
    user_entity::ActiveModel {
        email: Set(email.to_string()),
        display_name: Set(email.split('@').next().unwrap_or(email).to_string()),
        // 测试中不走密码校验
        password_hash: Set("!".to_string()),
        role: Set(role),
        device_token: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
    stock: i64,
    category: &str,
) -> Result<product_entity::Model, DbErr> {
    let now = Utc::now();
    product_entity::ActiveModel {
        name: Set(name.to_string()),
        price: Set(price),
        stock: Set(stock),
        category: Set(category.to_string()),
        image_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_table(
    db: &DatabaseConnection,
    label: &str,
) -> Result<table_entity::Model, DbErr> {
    table_entity::ActiveModel {
        label: Set(label.to_string()),
        active_order_id: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub fn as_current_user(user: &user_entity::Model) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}
