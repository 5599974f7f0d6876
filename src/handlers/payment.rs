use crate::external::PaymentGateway;
use crate::models::*;
use actix_web::{HttpResponse, Result, web};

/// 兑换支付网关 Snap 令牌；任何失败统一返回 500 与 `{error}`
#[utoipa::path(
    post,
    path = "/api/payment",
    tag = "payment",
    request_body = PaymentTokenRequest,
    responses(
        (status = 200, description = "支付令牌", body = PaymentTokenResponse),
        (status = 405, description = "仅支持 POST", body = PaymentErrorResponse),
        (status = 500, description = "令牌创建失败", body = PaymentErrorResponse)
    )
)]
pub async fn create_payment_token(
    gateway: web::Data<PaymentGateway>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let request: PaymentTokenRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Malformed payment request: {e}");
            return Ok(HttpResponse::InternalServerError().json(PaymentErrorResponse {
                error: format!("Invalid request body: {e}"),
            }));
        }
    };

    match gateway.create_transaction_token(&request).await {
        Ok(snap) => Ok(HttpResponse::Ok().json(PaymentTokenResponse { token: snap.token })),
        Err(e) => {
            log::error!("Payment token for {} failed: {e}", request.order_id);
            Ok(HttpResponse::InternalServerError().json(PaymentErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(PaymentErrorResponse {
        error: "Method not allowed".to_string(),
    })
}

/// 挂在 `/api/v1` 之外
pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/payment")
            .route(web::post().to(create_payment_token))
            .default_service(web::route().to(method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaymentConfig;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    #[actix_web::test]
    async fn test_non_post_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(PaymentGateway::new(PaymentConfig::default())))
                .configure(payment_config),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/payment").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_failures_map_to_server_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(PaymentGateway::new(PaymentConfig::default())))
                .configure(payment_config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/payment")
            .set_json(serde_json::json!({ "orderId": "ORD-1", "amount": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());

        let req = test::TestRequest::post()
            .uri("/api/payment")
            .insert_header(("content-type", "application/json"))
            .set_payload("not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
