use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentItem {
    #[schema(example = "1")]
    pub id: String,
    #[schema(example = "Nasi Goreng")]
    pub name: String,
    #[schema(example = 15000)]
    pub price: i64,
    #[schema(example = 2)]
    pub quantity: i32,
}

/// 前端结账页请求支付令牌（字段沿用前端 camelCase）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTokenRequest {
    #[schema(example = "ORD-261018-K7Q2MX")]
    pub order_id: String,
    #[schema(example = 30037)]
    pub amount: i64,
    pub items: Option<Vec<PaymentItem>>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentErrorResponse {
    pub error: String,
}
