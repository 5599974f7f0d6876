use crate::entities::{
    OrderStatus, PaymentStatus, Role, order_entity as orders, order_item_entity as order_items,
};
use crate::error::AppResult;
use crate::middlewares::CurrentUser;
use crate::models::*;
use crate::utils::parse_date_range;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct ReportService {
    pool: DatabaseConnection,
}

impl ReportService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 销售汇总：按状态计数，营收只统计已支付且未被拒绝的订单
    pub async fn sales_report(
        &self,
        actor: &CurrentUser,
        query: &SalesReportQuery,
    ) -> AppResult<SalesReportResponse> {
        actor.require_any(&[Role::Admin, Role::Head])?;
        let (start, end) =
            parse_date_range(query.start_date.as_deref(), query.end_date.as_deref())?;

        let mut range = Condition::all();
        if let Some(start) = start {
            range = range.add(orders::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            range = range.add(orders::Column::CreatedAt.lt(end));
        }

        #[derive(Debug, sea_orm::FromQueryResult)]
        struct StatusRow {
            status: String,
            count: i64,
        }
        let by_status: Vec<StatusCount> = orders::Entity::find()
            .filter(range.clone())
            .select_only()
            .column(orders::Column::Status)
            .column_as(Expr::val(1).count(), "count")
            .group_by(orders::Column::Status)
            .order_by_asc(orders::Column::Status)
            .into_model::<StatusRow>()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|r| StatusCount {
                status: r.status,
                count: r.count,
            })
            .collect();
        let total_orders = by_status.iter().map(|s| s.count).sum();

        // 金额在内存中累加，避免不同数据库 SUM 返回类型不一致
        let paid = orders::Entity::find()
            .filter(range)
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Paid))
            .filter(orders::Column::Status.ne(OrderStatus::PaymentRejected))
            .all(&self.pool)
            .await?;
        let paid_orders = paid.len() as i64;
        let revenue = paid.iter().map(|o| o.total).sum();

        let mut products: HashMap<i64, ProductSales> = HashMap::new();
        if !paid.is_empty() {
            let ids: Vec<i64> = paid.iter().map(|o| o.id).collect();
            for item in order_items::Entity::find()
                .filter(order_items::Column::OrderId.is_in(ids))
                .all(&self.pool)
                .await?
            {
                let entry = products
                    .entry(item.product_id)
                    .or_insert_with(|| ProductSales {
                        product_id: item.product_id,
                        product_name: item.product_name.clone(),
                        quantity: 0,
                        revenue: 0,
                    });
                entry.quantity += item.quantity as i64;
                entry.revenue += item.line_total();
            }
        }
        let mut products: Vec<ProductSales> = products.into_values().collect();
        products.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        Ok(SalesReportResponse {
            start_date: query.start_date.clone(),
            end_date: query.end_date.clone(),
            total_orders,
            paid_orders,
            revenue,
            by_status,
            products,
        })
    }
}
