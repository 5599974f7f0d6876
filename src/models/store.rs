use crate::entities::store_settings_entity;
use crate::utils::{GeoPoint, ServiceArea};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreSettingsResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub polygon: Vec<GeoPoint>,
    pub updated_at: DateTime<Utc>,
}

impl StoreSettingsResponse {
    pub fn from_model(m: store_settings_entity::Model) -> Self {
        Self {
            polygon: parse_polygon(m.polygon.as_deref()),
            latitude: m.latitude,
            longitude: m.longitude,
            radius_km: m.radius_km,
            updated_at: m.updated_at,
        }
    }

    pub fn service_area(&self) -> ServiceArea {
        ServiceArea {
            center: GeoPoint::new(self.latitude, self.longitude),
            radius_km: self.radius_km,
            polygon: self.polygon.clone(),
        }
    }
}

/// 已存储的 polygon JSON 无法解析时按未配置处理
pub fn parse_polygon(raw: Option<&str>) -> Vec<GeoPoint> {
    match raw {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(s).unwrap_or_else(|e| {
            log::warn!("Invalid stored polygon, ignoring: {e}");
            Vec::new()
        }),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStoreSettingsRequest {
    #[schema(example = -6.2088)]
    pub latitude: f64,
    #[schema(example = 106.8456)]
    pub longitude: f64,
    #[schema(example = 0.1)]
    pub radius_km: Option<f64>,
    /// 为空或不传表示只使用半径
    pub polygon: Option<Vec<GeoPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeofenceCheckRequest {
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeofenceCheckResponse {
    pub allowed: bool,
    /// 未配置门店位置时为 false（直接放行）
    pub configured: bool,
    pub distance_km: Option<f64>,
}
