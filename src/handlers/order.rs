use crate::entities::Role;
use crate::middlewares::{CurrentUser, require_current_user};
use crate::models::*;
use crate::services::{OrderEvent, OrderService, resolve_station, station_view};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use futures_util::stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "下单成功", body = OrderResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "不在服务范围内"),
        (status = 409, description = "桌台已被占用或库存不足")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.create_order(&user, request.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "order",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<String>, Query, description = "出品状态"),
        ("payment_status" = Option<String>, Query, description = "支付状态"),
        ("table_label" = Option<String>, Query, description = "桌号"),
        ("start_date" = Option<String>, Query, description = "开始日期 (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "结束日期 (YYYY-MM-DD)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单列表"),
        (status = 403, description = "无权限")
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.list_orders(&user, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/mine",
    tag = "order",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "我的订单")
    )
)]
pub async fn my_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.my_orders(&user, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/station",
    tag = "order",
    params(
        ("station" = Option<Station>, Query, description = "kitchen / bar，仅后台账号可指定")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "工位待出品订单", body = [OrderResponse]),
        (status = 403, description = "无权限")
    )
)]
pub async fn station_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<StationQuery>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.station_orders(&user, query.station).await {
        Ok(orders) => Ok(HttpResponse::Ok().json(ApiResponse::success(orders))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 按订阅者身份裁剪事件；工位订阅只看到本工位的明细
fn project_event(event: OrderEvent, station: Option<Station>) -> OrderEvent {
    match station {
        Some(station) => OrderEvent {
            order: event.order.as_ref().and_then(|o| station_view(o, station)),
            ..event
        },
        None => event,
    }
}

fn sse_frame(event: &OrderEvent) -> web::Bytes {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: {}\ndata: {}\n\n", event.kind.as_str(), data))
}

struct StreamState {
    rx: broadcast::Receiver<OrderEvent>,
    station: Option<Station>,
    user_id: i64,
}

#[utoipa::path(
    get,
    path = "/orders/stream",
    tag = "order",
    params(
        ("station" = Option<Station>, Query, description = "后台账号可按工位订阅"),
        ("access_token" = Option<String>, Query, description = "EventSource 无法设置请求头时使用")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "text/event-stream 订单变更事件"),
        (status = 403, description = "无权限")
    )
)]
pub async fn order_stream(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<StationQuery>,
) -> Result<HttpResponse> {
    let user: CurrentUser = require_current_user(&req)?;
    user.require_any(&[Role::Admin, Role::Head, Role::Kitchen, Role::Barista])?;

    let station = match (user.role.is_station(), query.station) {
        (true, _) | (false, Some(_)) => Some(resolve_station(user.role, query.station)?),
        (false, None) => None,
    };

    log::info!(
        "Order stream opened by {} ({}), station={:?}",
        user.id,
        user.role,
        station
    );
    let state = StreamState {
        rx: order_service.events().subscribe(),
        station,
        user_id: user.id,
    };

    let body = stream::unfold(state, |mut state| async move {
        loop {
            match tokio::time::timeout(KEEP_ALIVE_INTERVAL, state.rx.recv()).await {
                Ok(Ok(event)) => {
                    let frame = sse_frame(&project_event(event, state.station));
                    return Some((Ok::<_, Infallible>(frame), state));
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    log::warn!(
                        "Order stream for {} lagged, skipped {} events",
                        state.user_id,
                        skipped
                    );
                    continue;
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => {
                    return Some((Ok(web::Bytes::from_static(b": keep-alive\n\n")), state));
                }
            }
        }
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body))
}

#[utoipa::path(
    get,
    path = "/orders/{order_code}",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单详情", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.get_order(&user, &path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/{order_code}/advance",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已推进到下一状态", body = OrderResponse),
        (status = 409, description = "状态不可推进或已被他人更新")
    )
)]
pub async fn advance_status(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.advance_status(&user, &path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/{order_code}/pay",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已确认收款（重复确认无副作用）", body = OrderResponse),
        (status = 403, description = "无权限")
    )
)]
pub async fn confirm_payment(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.confirm_payment(&user, &path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/{order_code}/reject",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已拒绝付款", body = OrderResponse),
        (status = 409, description = "订单状态不允许拒绝")
    )
)]
pub async fn reject_payment(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.reject_payment(&user, &path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/orders/{order_code}/proof",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    request_body = AttachPaymentProofRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "凭证已记录", body = OrderResponse),
        (status = 409, description = "订单已支付或已拒绝")
    )
)]
pub async fn attach_payment_proof(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<AttachPaymentProofRequest>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service
        .attach_payment_proof(&user, &path, request.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/orders/{order_code}",
    tag = "order",
    params(
        ("order_code" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单已删除"),
        (status = 403, description = "无权限")
    )
)]
pub async fn delete_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match order_service.delete_order(&user, &path).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Order deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(list_orders))
            .route("/mine", web::get().to(my_orders))
            .route("/station", web::get().to(station_orders))
            .route("/stream", web::get().to(order_stream))
            .route("/{order_code}", web::get().to(get_order))
            .route("/{order_code}", web::delete().to(delete_order))
            .route("/{order_code}/advance", web::post().to(advance_status))
            .route("/{order_code}/pay", web::post().to(confirm_payment))
            .route("/{order_code}/reject", web::post().to(reject_payment))
            .route("/{order_code}/proof", web::put().to(attach_payment_proof)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OrderStatus, PaymentMethod, PaymentStatus};
    use crate::services::OrderEventKind;
    use chrono::Utc;

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> OrderResponse {
        let now = Utc::now();
        OrderResponse {
            id: 1,
            order_code: "ORD-261018-AAAAAA".into(),
            table_label: "5".into(),
            customer_name: "Budi".into(),
            items: vec![
                OrderItemResponse {
                    product_id: 1,
                    product_name: "Nasi Goreng".into(),
                    unit_price: 15000,
                    quantity: 1,
                    note: None,
                    category: "Makanan".into(),
                },
                OrderItemResponse {
                    product_id: 2,
                    product_name: "Kopi Susu".into(),
                    unit_price: 18000,
                    quantity: 1,
                    note: None,
                    category: "Kopi".into(),
                },
            ],
            sub_total: 33000,
            unique_code: 12,
            total: 33012,
            payment_method: PaymentMethod::Qris,
            payment_proof_url: None,
            note: None,
            next_status: status.next(),
            status,
            payment_status,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_project_event_for_station() {
        let event = OrderEvent::new(
            OrderEventKind::StatusChanged,
            order(OrderStatus::Cooking, PaymentStatus::Paid),
        );
        let bar = project_event(event.clone(), Some(Station::Bar));
        let items = bar.order.unwrap().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_name, "Kopi Susu");

        let unpaid = OrderEvent::new(
            OrderEventKind::Created,
            order(OrderStatus::Pending, PaymentStatus::Unpaid),
        );
        assert!(project_event(unpaid, Some(Station::Kitchen)).order.is_none());

        let full = project_event(event, None);
        assert_eq!(full.order.unwrap().items.len(), 2);
    }

    #[test]
    fn test_sse_frame_format() {
        let frame = sse_frame(&OrderEvent::deleted("ORD-1".into()));
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("event: order_deleted\ndata: {"));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains("\"order_code\":\"ORD-1\""));
    }
}
