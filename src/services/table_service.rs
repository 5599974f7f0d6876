//! 桌台管理与占用判定
//!
//! 一张桌台同一时间只能有一笔进行中的订单。占用通过 `tables.active_order_id`
//! 的条件更新原子声明，订单进入终态或被删除时释放。

use crate::entities::{OrderStatus, order_entity as orders, table_entity as tables};
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// 该桌是否存在进行中的订单
pub async fn has_active_order<C: ConnectionTrait>(conn: &C, table_label: &str) -> AppResult<bool> {
    let count = orders::Entity::find()
        .filter(orders::Column::TableLabel.eq(table_label))
        .filter(orders::Column::Status.is_in(OrderStatus::ACTIVE))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// 原子声明桌台；0 行受影响说明已被其他订单占用
pub async fn claim_table<C: ConnectionTrait>(
    conn: &C,
    table_label: &str,
    order_id: i64,
) -> AppResult<()> {
    let result = tables::Entity::update_many()
        .col_expr(tables::Column::ActiveOrderId, Expr::value(order_id))
        .filter(tables::Column::Label.eq(table_label))
        .filter(tables::Column::ActiveOrderId.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected == 1 {
        Ok(())
    } else {
        log::warn!("Table {table_label} claim lost to a concurrent order");
        Err(AppError::TableOccupied(table_label.to_string()))
    }
}

/// 释放由该订单持有的桌台（未持有时为空操作）
pub async fn release_table<C: ConnectionTrait>(conn: &C, order_id: i64) -> AppResult<()> {
    let result = tables::Entity::update_many()
        .col_expr(tables::Column::ActiveOrderId, Expr::value(Option::<i64>::None))
        .filter(tables::Column::ActiveOrderId.eq(order_id))
        .exec(conn)
        .await?;
    if result.rows_affected > 0 {
        log::debug!("Table released by order {order_id}");
    }
    Ok(())
}

#[derive(Clone)]
pub struct TableService {
    pool: DatabaseConnection,
    public_base_url: String,
}

impl TableService {
    pub fn new(pool: DatabaseConnection, public_base_url: String) -> Self {
        Self {
            pool,
            public_base_url,
        }
    }

    async fn find_by_label(&self, label: &str) -> AppResult<Option<tables::Model>> {
        Ok(tables::Entity::find()
            .filter(tables::Column::Label.eq(label))
            .one(&self.pool)
            .await?)
    }

    pub async fn list_tables(&self) -> AppResult<Vec<TableResponse>> {
        let rows = tables::Entity::find()
            .order_by_asc(tables::Column::Label)
            .all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| TableResponse::from_model(m, &self.public_base_url))
            .collect())
    }

    pub async fn create_table(&self, request: CreateTableRequest) -> AppResult<TableResponse> {
        let label = request.label.trim();
        if label.is_empty() || label.chars().count() > 50 {
            return Err(AppError::ValidationError(
                "Table label must be 1-50 characters".to_string(),
            ));
        }
        if self.find_by_label(label).await?.is_some() {
            return Err(AppError::Conflict(format!("Table {label} already exists")));
        }

        let model = tables::ActiveModel {
            label: Set(label.to_string()),
            active_order_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Table created: {}", model.label);
        Ok(TableResponse::from_model(model, &self.public_base_url))
    }

    pub async fn delete_table(&self, id: i64) -> AppResult<()> {
        let table = tables::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Table {id} not found")))?;

        if table.is_claimed() || has_active_order(&self.pool, &table.label).await? {
            return Err(AppError::TableOccupied(table.label));
        }

        tables::Entity::delete_by_id(id).exec(&self.pool).await?;
        log::info!("Table deleted: {}", table.label);
        Ok(())
    }

    /// 结账前查询：桌台是否有进行中的订单
    pub async fn is_table_occupied(&self, label: &str) -> AppResult<bool> {
        has_active_order(&self.pool, label.trim()).await
    }

    pub async fn occupancy(&self, label: &str) -> AppResult<TableOccupancyResponse> {
        let label = label.trim();
        if self.find_by_label(label).await?.is_none() {
            return Err(AppError::NotFound(format!("Table {label} not found")));
        }
        Ok(TableOccupancyResponse {
            label: label.to_string(),
            occupied: self.is_table_occupied(label).await?,
        })
    }
}
