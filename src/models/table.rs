use crate::entities::table_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableResponse {
    pub id: i64,
    pub label: String,
    pub occupied: bool,
    /// 二维码内容：带桌号的点餐链接
    pub order_url: String,
    pub created_at: DateTime<Utc>,
}

impl TableResponse {
    pub fn from_model(m: table_entity::Model, public_base_url: &str) -> Self {
        Self {
            occupied: m.is_claimed(),
            order_url: order_url(public_base_url, &m.label),
            id: m.id,
            label: m.label,
            created_at: m.created_at,
        }
    }
}

pub fn order_url(public_base_url: &str, label: &str) -> String {
    let encoded: String = label
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!(
        "{}/order?table={}",
        public_base_url.trim_end_matches('/'),
        encoded
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTableRequest {
    #[schema(example = "5")]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableOccupancyResponse {
    pub label: String,
    pub occupied: bool,
}
