use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use crate::models::{PaymentItem, PaymentTokenRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SANDBOX_URL: &str = "https://app.sandbox.midtrans.com/snap/v1/transactions";
const PRODUCTION_URL: &str = "https://app.midtrans.com/snap/v1/transactions";

#[derive(Debug, Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SnapTransactionRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    #[serde(skip_serializing_if = "no_items")]
    item_details: &'a [PaymentItem],
    customer_details: CustomerDetails<'a>,
}

fn no_items(items: &&[PaymentItem]) -> bool {
    items.is_empty()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapToken {
    pub token: String,
    pub redirect_url: Option<String>,
}

/// 支付网关 Snap 令牌交换
#[derive(Clone)]
pub struct PaymentGateway {
    client: Client,
    config: PaymentConfig,
}

impl PaymentGateway {
    pub fn new(config: PaymentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    fn endpoint(&self) -> &'static str {
        if self.config.is_production {
            PRODUCTION_URL
        } else {
            SANDBOX_URL
        }
    }

    fn build_body(request: &PaymentTokenRequest) -> AppResult<serde_json::Value> {
        if request.order_id.trim().is_empty() {
            return Err(AppError::ValidationError("orderId is required".to_string()));
        }
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "amount must be greater than 0".to_string(),
            ));
        }

        let body = SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id: request.order_id.trim(),
                gross_amount: request.amount,
            },
            item_details: request.items.as_deref().unwrap_or_default(),
            customer_details: CustomerDetails {
                first_name: request.customer_name.as_deref(),
                email: request.customer_email.as_deref(),
            },
        };
        Ok(serde_json::to_value(body)?)
    }

    pub async fn create_transaction_token(
        &self,
        request: &PaymentTokenRequest,
    ) -> AppResult<SnapToken> {
        if self.config.server_key.is_empty() {
            return Err(AppError::ConfigError(
                "Payment server key is not configured".to_string(),
            ));
        }
        let body = Self::build_body(request)?;

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.config.server_key, Some(""))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let token: SnapToken = response.json().await?;
            log::info!("Payment token created for order {}", request.order_id);
            Ok(token)
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            log::error!(
                "Payment token request for {} failed: {} {}",
                request.order_id,
                status,
                error_text
            );
            Err(AppError::ExternalApiError(format!(
                "Payment gateway returned {status}: {error_text}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PaymentTokenRequest {
        PaymentTokenRequest {
            order_id: "ORD-261018-K7Q2MX".into(),
            amount: 30037,
            items: Some(vec![PaymentItem {
                id: "1".into(),
                name: "Nasi Goreng".into(),
                price: 15000,
                quantity: 2,
            }]),
            customer_name: Some("Budi".into()),
            customer_email: None,
        }
    }

    #[test]
    fn test_build_body_shape() {
        let body = PaymentGateway::build_body(&request()).unwrap();
        assert_eq!(body["transaction_details"]["order_id"], "ORD-261018-K7Q2MX");
        assert_eq!(body["transaction_details"]["gross_amount"], 30037);
        assert_eq!(body["item_details"][0]["quantity"], 2);
        assert_eq!(body["customer_details"]["first_name"], "Budi");
        assert!(body["customer_details"].get("email").is_none());
    }

    #[test]
    fn test_build_body_rejects_invalid_amount() {
        let mut req = request();
        req.amount = 0;
        assert!(matches!(
            PaymentGateway::build_body(&req),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_endpoint_by_environment() {
        let sandbox = PaymentGateway::new(PaymentConfig::default());
        assert_eq!(sandbox.endpoint(), SANDBOX_URL);
        let production = PaymentGateway::new(PaymentConfig {
            server_key: "key".into(),
            is_production: true,
        });
        assert_eq!(production.endpoint(), PRODUCTION_URL);
    }

    #[tokio::test]
    async fn test_missing_server_key_fails_before_request() {
        let gateway = PaymentGateway::new(PaymentConfig::default());
        let result = gateway.create_transaction_token(&request()).await;
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
