use crate::entities::product_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product_entity::Model> for ProductResponse {
    fn from(m: product_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            price: m.price,
            stock: m.stock,
            category: m.category,
            image_url: m.image_url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Nasi Goreng")]
    pub name: String,
    #[schema(example = 15000)]
    pub price: i64,
    #[schema(example = 20)]
    pub stock: i64,
    #[schema(example = "Makanan")]
    pub category: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub category: Option<String>,
}

/// 菜单按分类分组
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuCategory {
    pub category: String,
    pub products: Vec<ProductResponse>,
}
