use crate::entities::{Role, user_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "budi@example.com")]
    pub email: String,
    #[schema(example = "kopisusu1")]
    pub password: String,
    #[schema(example = "Budi")]
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "budi@example.com")]
    pub email: String,
    #[schema(example = "kopisusu1")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            display_name: m.display_name,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// 管理员开通员工账号，角色显式指定
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    #[schema(example = "dapur1@cafe.id")]
    pub email: String,
    pub password: String,
    #[schema(example = "Dapur 1")]
    pub display_name: String,
    /// 不传时仅在开启旧版邮箱推断时自动推断
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceTokenRequest {
    pub device_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NavigationQuery {
    #[schema(example = "/admin/orders")]
    pub route: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}
