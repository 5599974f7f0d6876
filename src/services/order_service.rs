use crate::entities::{
    OrderStatus, PaymentStatus, Role, order_entity as orders, order_item_entity as order_items,
    product_entity as products, table_entity as tables,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;
use crate::services::table_service::{claim_table, has_active_order, release_table};
use crate::services::{OrderEvent, OrderEventHub, OrderEventKind, StoreService};
use crate::utils::{generate_order_code, generate_unique_code, parse_date_range};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use std::collections::HashMap;

const ORDER_CODE_ATTEMPTS: usize = 5;
const MAX_PROOF_URL_LEN: usize = 1024;

/// 出品角色与后台角色
const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Head, Role::Kitchen, Role::Barista];
const MANAGER_ROLES: &[Role] = &[Role::Admin, Role::Head];

/// 小计与应付金额（应付 = 小计 + 识别码）
pub fn compute_totals(lines: &[(i64, i32)], unique_code: i64) -> AppResult<(i64, i64)> {
    let overflow = || AppError::ValidationError("Order amount is too large".to_string());
    let sub_total = lines.iter().try_fold(0i64, |acc, &(price, qty)| {
        price
            .checked_mul(qty as i64)
            .and_then(|line| acc.checked_add(line))
    });
    let sub_total = sub_total.ok_or_else(overflow)?;
    let total = sub_total.checked_add(unique_code).ok_or_else(overflow)?;
    Ok((sub_total, total))
}

/// 工位屏视图：只保留本工位的明细，不可见时返回 None
pub fn station_view(order: &OrderResponse, station: Station) -> Option<OrderResponse> {
    if order.payment_status != PaymentStatus::Paid
        || !station.visible_statuses().contains(&order.status)
    {
        return None;
    }
    let items: Vec<OrderItemResponse> = order
        .items
        .iter()
        .filter(|i| Station::for_category(&i.category) == station)
        .cloned()
        .collect();
    if items.is_empty() {
        return None;
    }
    Some(OrderResponse {
        items,
        ..order.clone()
    })
}

/// 厨房 / 吧台账号固定工位；后台可查看任一工位（默认厨房）
pub fn resolve_station(role: Role, requested: Option<Station>) -> AppResult<Station> {
    match role {
        Role::Kitchen => Ok(Station::Kitchen),
        Role::Barista => Ok(Station::Bar),
        Role::Admin | Role::Head => Ok(requested.unwrap_or(Station::Kitchen)),
        Role::User => Err(AppError::PermissionDenied),
    }
}

fn validate_create_request(request: &CreateOrderRequest) -> AppResult<()> {
    if request.customer_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Customer name is required".to_string(),
        ));
    }
    if request.customer_name.chars().count() > 100 {
        return Err(AppError::ValidationError(
            "Customer name is too long".to_string(),
        ));
    }
    if request.table_label.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Table is required, please scan the table QR code".to_string(),
        ));
    }
    if request.items.is_empty() {
        return Err(AppError::ValidationError(
            "Order must contain at least one item".to_string(),
        ));
    }
    for item in &request.items {
        if item.quantity < 1 || item.quantity > MAX_ITEM_QUANTITY {
            return Err(AppError::ValidationError(format!(
                "Quantity must be between 1 and {MAX_ITEM_QUANTITY}"
            )));
        }
        if item
            .note
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_LEN)
        {
            return Err(AppError::ValidationError("Item note is too long".to_string()));
        }
    }
    if request
        .note
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_LEN)
    {
        return Err(AppError::ValidationError("Order note is too long".to_string()));
    }
    Ok(())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    store_service: StoreService,
    events: OrderEventHub,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, store_service: StoreService, events: OrderEventHub) -> Self {
        Self {
            pool,
            store_service,
            events,
        }
    }

    pub fn events(&self) -> &OrderEventHub {
        &self.events
    }

    async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<orders::Model> {
        orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(code))
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {code} not found")))
    }

    async fn load_response(&self, order: orders::Model) -> AppResult<OrderResponse> {
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_items::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// 批量附加明细，保持订单原有顺序
    async fn attach_items(&self, rows: Vec<orders::Model>) -> AppResult<Vec<OrderResponse>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<i64, Vec<order_items::Model>> = HashMap::new();
        for item in order_items::Entity::find()
            .filter(order_items::Column::OrderId.is_in(ids))
            .order_by_asc(order_items::Column::Id)
            .all(&self.pool)
            .await?
        {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(rows
            .into_iter()
            .map(|o| {
                let items = grouped.remove(&o.id).unwrap_or_default();
                OrderResponse::from_parts(o, items)
            })
            .collect())
    }

    async fn paginate(
        &self,
        select: Select<orders::Entity>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let total = select.clone().count(&self.pool).await? as i64;
        let rows = select
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .offset(params.get_offset() as u64)
            .limit(params.get_limit() as u64)
            .all(&self.pool)
            .await?;
        let data = self.attach_items(rows).await?;
        Ok(PaginatedResponse::new(
            data,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    fn publish(&self, kind: OrderEventKind, order: &OrderResponse) {
        self.events.publish(OrderEvent::new(kind, order.clone()));
    }

    async fn generate_order_code<C: ConnectionTrait>(&self, conn: &C) -> AppResult<String> {
        for _ in 0..ORDER_CODE_ATTEMPTS {
            let code = generate_order_code(Utc::now());
            let exists = orders::Entity::find()
                .filter(orders::Column::OrderCode.eq(code.as_str()))
                .count(conn)
                .await?
                > 0;
            if !exists {
                return Ok(code);
            }
        }
        Err(AppError::InternalError(
            "Failed to generate a unique order code".to_string(),
        ))
    }

    /// 顾客下单
    ///
    /// 围栏检查之后，桌台占用、库存预留、订单写入在同一事务内完成，
    /// 任一步失败整体回滚。
    pub async fn create_order(
        &self,
        actor: &CurrentUser,
        request: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        actor.require_any(&[Role::User])?;
        validate_create_request(&request)?;
        self.store_service
            .ensure_within_service_area(request.location)
            .await?;

        let table_label = request.table_label.trim().to_string();
        let now = Utc::now();

        let txn = self.pool.begin().await?;

        let table_exists = tables::Entity::find()
            .filter(tables::Column::Label.eq(table_label.as_str()))
            .count(&txn)
            .await?
            > 0;
        if !table_exists {
            return Err(AppError::NotFound(format!("Table {table_label} not found")));
        }
        if has_active_order(&txn, &table_label).await? {
            log::info!("Order rejected, table {table_label} is occupied");
            return Err(AppError::TableOccupied(table_label));
        }

        // 按商品当前价格计价，同时条件扣减库存
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = products::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::ValidationError(format!("Product {} not found", item.product_id))
                })?;

            let qty = item.quantity as i64;
            let reserved = products::Entity::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).sub(qty),
                )
                .col_expr(products::Column::UpdatedAt, Expr::value(now))
                .filter(products::Column::Id.eq(product.id))
                .filter(products::Column::Stock.gte(qty))
                .exec(&txn)
                .await?;
            if reserved.rows_affected != 1 {
                log::info!(
                    "Insufficient stock for {} (wanted {}, have {})",
                    product.name,
                    qty,
                    product.stock
                );
                return Err(AppError::InsufficientStock(product.name));
            }
            lines.push((product, item));
        }

        let unique_code = generate_unique_code();
        let priced: Vec<(i64, i32)> = lines
            .iter()
            .map(|(p, i)| (p.price, i.quantity))
            .collect();
        let (sub_total, total) = compute_totals(&priced, unique_code)?;
        let order_code = self.generate_order_code(&txn).await?;

        let order = orders::ActiveModel {
            order_code: Set(order_code),
            table_label: Set(table_label.clone()),
            customer_name: Set(request.customer_name.trim().to_string()),
            user_id: Set(Some(actor.id)),
            sub_total: Set(sub_total),
            unique_code: Set(unique_code),
            total: Set(total),
            payment_method: Set(request.payment_method),
            payment_proof_url: Set(None),
            note: Set(normalize_note(request.note)),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Unpaid),
            paid_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (product, item) in lines {
            let saved = order_items::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                unit_price: Set(product.price),
                quantity: Set(item.quantity),
                note: Set(normalize_note(item.note.clone())),
                category: Set(product.category),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(saved);
        }

        claim_table(&txn, &table_label, order.id).await?;
        txn.commit().await?;

        log::info!(
            "Order {} created for table {} by user {}, total {}",
            order.order_code,
            order.table_label,
            actor.id,
            order.total
        );
        let response = OrderResponse::from_parts(order, items);
        self.publish(OrderEventKind::Created, &response);
        Ok(response)
    }

    /// 推进到唯一合法的下一状态
    pub async fn advance_status(
        &self,
        actor: &CurrentUser,
        order_code: &str,
    ) -> AppResult<OrderResponse> {
        actor.require_any(STAFF_ROLES)?;
        let order = Self::find_by_code(&self.pool, order_code).await?;

        let next = order.status.next().ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "Order {} is already {}",
                order.order_code, order.status
            ))
        })?;
        if actor.role.is_station() && !order.is_paid() {
            return Err(AppError::InvalidTransition(format!(
                "Order {} is awaiting payment confirmation",
                order.order_code
            )));
        }

        let txn = self.pool.begin().await?;
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(next))
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(order.status))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(AppError::Conflict(format!(
                "Order {} was updated by someone else, please refresh",
                order.order_code
            )));
        }
        if next.is_terminal() {
            release_table(&txn, order.id).await?;
        }
        txn.commit().await?;

        log::info!(
            "Order {} advanced {} -> {} by {} ({})",
            order.order_code,
            order.status,
            next,
            actor.id,
            actor.role
        );
        let updated = Self::find_by_code(&self.pool, order_code).await?;
        let response = self.load_response(updated).await?;
        self.publish(OrderEventKind::StatusChanged, &response);
        Ok(response)
    }

    /// 确认收款，幂等；不改变出品状态
    pub async fn confirm_payment(
        &self,
        actor: &CurrentUser,
        order_code: &str,
    ) -> AppResult<OrderResponse> {
        actor.require_any(MANAGER_ROLES)?;
        let order = Self::find_by_code(&self.pool, order_code).await?;

        if order.is_paid() {
            return self.load_response(order).await;
        }
        if order.status == OrderStatus::PaymentRejected {
            return Err(AppError::InvalidTransition(format!(
                "Order {} payment was rejected",
                order.order_code
            )));
        }

        let now = Utc::now();
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::PaymentStatus, Expr::value(PaymentStatus::Paid))
            .col_expr(orders::Column::PaidAt, Expr::value(Some(now)))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Unpaid))
            .filter(orders::Column::Status.ne(OrderStatus::PaymentRejected))
            .exec(&self.pool)
            .await?;

        let updated = Self::find_by_code(&self.pool, order_code).await?;
        let response = self.load_response(updated).await?;
        if result.rows_affected == 1 {
            log::info!(
                "Payment confirmed for order {} by {}",
                order.order_code,
                actor.id
            );
            self.publish(OrderEventKind::PaymentConfirmed, &response);
        } else if response.payment_status != PaymentStatus::Paid {
            // 并发拒绝抢先
            return Err(AppError::Conflict(format!(
                "Order {} was updated by someone else, please refresh",
                order.order_code
            )));
        }
        Ok(response)
    }

    /// 拒绝付款：仅限待支付的 pending 订单，进入终态并释放桌台
    pub async fn reject_payment(
        &self,
        actor: &CurrentUser,
        order_code: &str,
    ) -> AppResult<OrderResponse> {
        actor.require_any(MANAGER_ROLES)?;
        let order = Self::find_by_code(&self.pool, order_code).await?;

        if order.status != OrderStatus::Pending || order.is_paid() {
            return Err(AppError::InvalidTransition(format!(
                "Only unpaid pending orders can be rejected (order {} is {}/{})",
                order.order_code, order.status, order.payment_status
            )));
        }

        let txn = self.pool.begin().await?;
        let result = orders::Entity::update_many()
            .col_expr(
                orders::Column::Status,
                Expr::value(OrderStatus::PaymentRejected),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Unpaid))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(AppError::Conflict(format!(
                "Order {} was updated by someone else, please refresh",
                order.order_code
            )));
        }
        release_table(&txn, order.id).await?;
        txn.commit().await?;

        log::info!(
            "Payment rejected for order {} by {}",
            order.order_code,
            actor.id
        );
        let updated = Self::find_by_code(&self.pool, order_code).await?;
        let response = self.load_response(updated).await?;
        self.publish(OrderEventKind::PaymentRejected, &response);
        Ok(response)
    }

    /// 记录转账凭证地址（文件上传由客户端直传对象存储）
    pub async fn attach_payment_proof(
        &self,
        actor: &CurrentUser,
        order_code: &str,
        request: AttachPaymentProofRequest,
    ) -> AppResult<OrderResponse> {
        actor.require_any(&[Role::User, Role::Admin, Role::Head])?;
        let url = request.payment_proof_url.trim();
        if url.len() > MAX_PROOF_URL_LEN
            || !(url.starts_with("https://") || url.starts_with("http://"))
        {
            return Err(AppError::ValidationError(
                "payment_proof_url must be an http(s) URL".to_string(),
            ));
        }

        let order = Self::find_by_code(&self.pool, order_code).await?;
        if actor.role == Role::User && order.user_id != Some(actor.id) {
            return Err(AppError::NotFound(format!("Order {order_code} not found")));
        }
        if order.is_paid() || order.status == OrderStatus::PaymentRejected {
            return Err(AppError::InvalidTransition(format!(
                "Order {} no longer accepts payment proof",
                order.order_code
            )));
        }

        let mut am = order.into_active_model();
        am.payment_proof_url = Set(Some(url.to_string()));
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;

        let response = self.load_response(updated).await?;
        self.publish(OrderEventKind::ProofAttached, &response);
        Ok(response)
    }

    /// 永久删除订单，同时释放其持有的桌台
    pub async fn delete_order(&self, actor: &CurrentUser, order_code: &str) -> AppResult<()> {
        actor.require_any(MANAGER_ROLES)?;

        let txn = self.pool.begin().await?;
        let order = Self::find_by_code(&txn, order_code).await?;
        release_table(&txn, order.id).await?;
        order_items::Entity::delete_many()
            .filter(order_items::Column::OrderId.eq(order.id))
            .exec(&txn)
            .await?;
        orders::Entity::delete_by_id(order.id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("Order {} deleted by {}", order.order_code, actor.id);
        self.events.publish(OrderEvent::deleted(order.order_code));
        Ok(())
    }

    /// 顾客只能查看自己的订单，员工可查看全部
    pub async fn get_order(&self, actor: &CurrentUser, order_code: &str) -> AppResult<OrderResponse> {
        let order = Self::find_by_code(&self.pool, order_code).await?;
        if actor.role == Role::User && order.user_id != Some(actor.id) {
            return Err(AppError::NotFound(format!("Order {order_code} not found")));
        }
        self.load_response(order).await
    }

    /// 后台订单列表（最新在前）
    pub async fn list_orders(
        &self,
        actor: &CurrentUser,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        actor.require_any(MANAGER_ROLES)?;
        let params = PaginationParams::new(query.page, query.per_page);
        let (start, end) =
            parse_date_range(query.start_date.as_deref(), query.end_date.as_deref())?;

        let mut select = orders::Entity::find();
        if let Some(status) = query.status {
            select = select.filter(orders::Column::Status.eq(status));
        }
        if let Some(payment_status) = query.payment_status {
            select = select.filter(orders::Column::PaymentStatus.eq(payment_status));
        }
        if let Some(label) = query.table_label.as_deref().filter(|l| !l.trim().is_empty()) {
            select = select.filter(orders::Column::TableLabel.eq(label.trim()));
        }
        if let Some(start) = start {
            select = select.filter(orders::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            select = select.filter(orders::Column::CreatedAt.lt(end));
        }

        self.paginate(select, &params).await
    }

    pub async fn my_orders(
        &self,
        actor: &CurrentUser,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let mut select = orders::Entity::find().filter(orders::Column::UserId.eq(actor.id));
        if let Some(status) = query.status {
            select = select.filter(orders::Column::Status.eq(status));
        }
        self.paginate(select, &params).await
    }

    /// 工位屏：已支付、处于本工位可见状态、含本工位明细的订单，最早的在前
    pub async fn station_orders(
        &self,
        actor: &CurrentUser,
        requested: Option<Station>,
    ) -> AppResult<Vec<OrderResponse>> {
        let station = resolve_station(actor.role, requested)?;
        let rows = orders::Entity::find()
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Paid))
            .filter(orders::Column::Status.is_in(station.visible_statuses().iter().copied()))
            .order_by_asc(orders::Column::CreatedAt)
            .order_by_asc(orders::Column::Id)
            .all(&self.pool)
            .await?;

        Ok(self
            .attach_items(rows)
            .await?
            .iter()
            .filter_map(|o| station_view(o, station))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeofenceConfig;
    use crate::entities::PaymentMethod;
    use crate::test_utils::*;
    use crate::utils::GeoPoint;

    struct Fixture {
        db: DatabaseConnection,
        svc: OrderService,
        customer: CurrentUser,
        admin: CurrentUser,
        kitchen: CurrentUser,
        barista: CurrentUser,
        nasi_goreng: products::Model,
        es_teh: products::Model,
    }

    async fn fixture() -> Fixture {
        let db = setup_test_db().await.unwrap();
        let customer = create_test_user(&db, "budi@example.com", Role::User)
            .await
            .unwrap();
        let admin = create_test_user(&db, "admin@cafe.id", Role::Admin)
            .await
            .unwrap();
        let kitchen = create_test_user(&db, "dapur@cafe.id", Role::Kitchen)
            .await
            .unwrap();
        let barista = create_test_user(&db, "bar@cafe.id", Role::Barista)
            .await
            .unwrap();
        let nasi_goreng = create_test_product(&db, "Nasi Goreng", 15000, 10, "Makanan")
            .await
            .unwrap();
        let es_teh = create_test_product(&db, "Es Teh", 5000, 10, "Minuman")
            .await
            .unwrap();
        create_test_table(&db, "5").await.unwrap();
        create_test_table(&db, "6").await.unwrap();

        let store = StoreService::new(db.clone(), GeofenceConfig::default());
        let svc = OrderService::new(db.clone(), store, OrderEventHub::new());
        Fixture {
            db,
            svc,
            customer: as_current_user(&customer),
            admin: as_current_user(&admin),
            kitchen: as_current_user(&kitchen),
            barista: as_current_user(&barista),
            nasi_goreng,
            es_teh,
        }
    }

    fn order_request(table: &str, items: Vec<(i64, i32)>) -> CreateOrderRequest {
        CreateOrderRequest {
            table_label: table.to_string(),
            customer_name: "Budi".to_string(),
            items: items
                .into_iter()
                .map(|(product_id, quantity)| CreateOrderItemRequest {
                    product_id,
                    quantity,
                    note: None,
                })
                .collect(),
            payment_method: PaymentMethod::BankTransfer,
            note: None,
            location: None,
        }
    }

    async fn stock_of(db: &DatabaseConnection, id: i64) -> i64 {
        products::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[test]
    fn test_compute_totals_adds_unique_code() {
        let (sub_total, total) = compute_totals(&[(15000, 2)], 37).unwrap();
        assert_eq!(sub_total, 30000);
        assert_eq!(total, 30037);
        assert!(compute_totals(&[(i64::MAX, 2)], 1).is_err());
    }

    #[tokio::test]
    async fn test_create_order_prices_and_reserves_stock() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 2)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.sub_total, 30000);
        assert!((1..=99).contains(&order.unique_code));
        assert_eq!(order.total, order.sub_total + order.unique_code);
        assert!(order.order_code.starts_with("ORD-"));
        assert_ne!(order.order_code, order.id.to_string());
        assert_eq!(order.next_status, Some(OrderStatus::Cooking));
        assert_eq!(stock_of(&f.db, f.nasi_goreng.id).await, 8);
    }

    #[tokio::test]
    async fn test_second_order_on_occupied_table_is_rejected() {
        let f = fixture().await;
        f.svc
            .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 1)]))
            .await
            .unwrap();

        let second = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await;
        assert!(matches!(second, Err(AppError::TableOccupied(label)) if label == "5"));
        // 回滚后库存不变
        assert_eq!(stock_of(&f.db, f.es_teh.id).await, 10);

        // 其他桌不受影响
        f.svc
            .create_order(&f.customer, order_request("6", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_whole_order() {
        let f = fixture().await;
        let result = f
            .svc
            .create_order(
                &f.customer,
                order_request("5", vec![(f.es_teh.id, 3), (f.nasi_goreng.id, 11)]),
            )
            .await;
        assert!(matches!(result, Err(AppError::InsufficientStock(name)) if name == "Nasi Goreng"));
        assert_eq!(stock_of(&f.db, f.es_teh.id).await, 10);
        assert_eq!(orders::Entity::find().count(&f.db).await.unwrap(), 0);
        assert!(!has_active_order(&f.db, "5").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_order_validation_and_roles() {
        let f = fixture().await;
        let mut empty_name = order_request("5", vec![(f.nasi_goreng.id, 1)]);
        empty_name.customer_name = "  ".into();
        assert!(matches!(
            f.svc.create_order(&f.customer, empty_name).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.svc
                .create_order(&f.customer, order_request("5", vec![]))
                .await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.svc
                .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 0)]))
                .await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.svc
                .create_order(&f.customer, order_request("99", vec![(f.nasi_goreng.id, 1)]))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.svc
                .create_order(&f.kitchen, order_request("5", vec![(f.nasi_goreng.id, 1)]))
                .await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_create_order_outside_service_area() {
        let f = fixture().await;
        let store = StoreService::new(f.db.clone(), GeofenceConfig::default());
        store
            .update_settings(UpdateStoreSettingsRequest {
                latitude: -6.2088,
                longitude: 106.8456,
                radius_km: Some(0.1),
                polygon: None,
            })
            .await
            .unwrap();

        let mut far = order_request("5", vec![(f.nasi_goreng.id, 1)]);
        far.location = Some(GeoPoint::new(-6.3, 106.8456));
        assert!(matches!(
            f.svc.create_order(&f.customer, far).await,
            Err(AppError::OutsideServiceArea)
        ));

        let mut near = order_request("5", vec![(f.nasi_goreng.id, 1)]);
        near.location = Some(GeoPoint::new(-6.2088, 106.8456));
        assert!(f.svc.create_order(&f.customer, near).await.is_ok());
    }

    #[tokio::test]
    async fn test_full_lifecycle_releases_table() {
        let f = fixture().await;
        let mut rx = f.svc.events().subscribe();
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 2)]))
            .await
            .unwrap();
        let code = order.order_code.clone();

        // 未支付时出品岗位不能推进
        assert!(matches!(
            f.svc.advance_status(&f.kitchen, &code).await,
            Err(AppError::InvalidTransition(_))
        ));

        let paid = f.svc.confirm_payment(&f.admin, &code).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Pending);
        assert!(paid.paid_at.is_some());

        let cooking = f.svc.advance_status(&f.kitchen, &code).await.unwrap();
        assert_eq!(cooking.status, OrderStatus::Cooking);
        let ready = f.svc.advance_status(&f.kitchen, &code).await.unwrap();
        assert_eq!(ready.status, OrderStatus::Ready);
        assert!(has_active_order(&f.db, "5").await.unwrap());

        let done = f.svc.advance_status(&f.kitchen, &code).await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(done.next_status, None);
        assert!(!has_active_order(&f.db, "5").await.unwrap());
        assert!(matches!(
            f.svc.advance_status(&f.kitchen, &code).await,
            Err(AppError::InvalidTransition(_))
        ));

        // 桌台释放后可再次下单
        f.svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();

        let kinds: Vec<OrderEventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                OrderEventKind::Created,
                OrderEventKind::PaymentConfirmed,
                OrderEventKind::StatusChanged,
                OrderEventKind::StatusChanged,
                OrderEventKind::StatusChanged,
                OrderEventKind::Created,
            ]
        );
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();
        let first = f
            .svc
            .confirm_payment(&f.admin, &order.order_code)
            .await
            .unwrap();

        let mut rx = f.svc.events().subscribe();
        let second = f
            .svc
            .confirm_payment(&f.admin, &order.order_code)
            .await
            .unwrap();
        assert_eq!(second.payment_status, PaymentStatus::Paid);
        assert_eq!(second.paid_at, first.paid_at);
        assert_eq!(second.updated_at, first.updated_at);
        assert!(rx.try_recv().is_err());

        assert!(matches!(
            f.svc.confirm_payment(&f.kitchen, &order.order_code).await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_reject_payment_is_terminal_and_frees_table() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 1)]))
            .await
            .unwrap();

        let rejected = f
            .svc
            .reject_payment(&f.admin, &order.order_code)
            .await
            .unwrap();
        assert_eq!(rejected.status, OrderStatus::PaymentRejected);
        assert_eq!(rejected.next_status, None);
        assert!(!has_active_order(&f.db, "5").await.unwrap());

        assert!(matches!(
            f.svc.advance_status(&f.admin, &order.order_code).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.svc.confirm_payment(&f.admin, &order.order_code).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.svc.reject_payment(&f.admin, &order.order_code).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_paid_order_cannot_be_rejected() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.nasi_goreng.id, 1)]))
            .await
            .unwrap();
        f.svc
            .confirm_payment(&f.admin, &order.order_code)
            .await
            .unwrap();
        assert!(matches!(
            f.svc.reject_payment(&f.admin, &order.order_code).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_station_views_split_items_and_hide_unpaid() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(
                &f.customer,
                order_request("5", vec![(f.nasi_goreng.id, 1), (f.es_teh.id, 2)]),
            )
            .await
            .unwrap();

        assert!(f.svc.station_orders(&f.kitchen, None).await.unwrap().is_empty());

        f.svc
            .confirm_payment(&f.admin, &order.order_code)
            .await
            .unwrap();

        let kitchen = f.svc.station_orders(&f.kitchen, None).await.unwrap();
        assert_eq!(kitchen.len(), 1);
        assert_eq!(kitchen[0].items.len(), 1);
        assert_eq!(kitchen[0].items[0].product_name, "Nasi Goreng");

        // 吧台不显示 pending
        assert!(f.svc.station_orders(&f.barista, None).await.unwrap().is_empty());

        f.svc
            .advance_status(&f.kitchen, &order.order_code)
            .await
            .unwrap();
        let bar = f.svc.station_orders(&f.barista, None).await.unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].items[0].product_name, "Es Teh");
        assert_eq!(bar[0].items[0].quantity, 2);

        // 后台可指定工位
        let admin_bar = f
            .svc
            .station_orders(&f.admin, Some(Station::Bar))
            .await
            .unwrap();
        assert_eq!(admin_bar.len(), 1);
        assert!(matches!(
            f.svc.station_orders(&f.customer, None).await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_customer_sees_only_own_orders() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();
        let other = create_test_user(&f.db, "sari@example.com", Role::User)
            .await
            .unwrap();
        let other = as_current_user(&other);

        assert!(f.svc.get_order(&f.customer, &order.order_code).await.is_ok());
        assert!(matches!(
            f.svc.get_order(&other, &order.order_code).await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.svc.get_order(&f.barista, &order.order_code).await.is_ok());

        let mine = f
            .svc
            .my_orders(&f.customer, &OrderQuery::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 1);
        let theirs = f.svc.my_orders(&other, &OrderQuery::default()).await.unwrap();
        assert_eq!(theirs.total, 0);
    }

    #[tokio::test]
    async fn test_attach_proof_and_delete() {
        let f = fixture().await;
        let order = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();

        let bad = AttachPaymentProofRequest {
            payment_proof_url: "ftp://x".into(),
        };
        assert!(matches!(
            f.svc
                .attach_payment_proof(&f.customer, &order.order_code, bad)
                .await,
            Err(AppError::ValidationError(_))
        ));
        let with_proof = f
            .svc
            .attach_payment_proof(
                &f.customer,
                &order.order_code,
                AttachPaymentProofRequest {
                    payment_proof_url: "https://cdn.example.com/p.jpg".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            with_proof.payment_proof_url.as_deref(),
            Some("https://cdn.example.com/p.jpg")
        );

        assert!(matches!(
            f.svc.delete_order(&f.customer, &order.order_code).await,
            Err(AppError::PermissionDenied)
        ));
        f.svc.delete_order(&f.admin, &order.order_code).await.unwrap();
        assert!(!has_active_order(&f.db, "5").await.unwrap());
        assert!(matches!(
            f.svc.get_order(&f.admin, &order.order_code).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_filters() {
        let f = fixture().await;
        let a = f
            .svc
            .create_order(&f.customer, order_request("5", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();
        f.svc
            .create_order(&f.customer, order_request("6", vec![(f.es_teh.id, 1)]))
            .await
            .unwrap();
        f.svc.confirm_payment(&f.admin, &a.order_code).await.unwrap();

        let all = f
            .svc
            .list_orders(&f.admin, &OrderQuery::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        let paid = f
            .svc
            .list_orders(
                &f.admin,
                &OrderQuery {
                    payment_status: Some(PaymentStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.total, 1);
        assert_eq!(paid.data[0].order_code, a.order_code);
        assert_eq!(paid.data[0].items.len(), 1);

        assert!(matches!(
            f.svc.list_orders(&f.kitchen, &OrderQuery::default()).await,
            Err(AppError::PermissionDenied)
        ));
    }
}
