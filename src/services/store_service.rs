use crate::config::GeofenceConfig;
use crate::entities::store_settings_entity as settings;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{GeoPoint, MIN_POLYGON_POINTS, haversine_km, is_within_service_area};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryOrder, Set,
};

#[derive(Clone)]
pub struct StoreService {
    pool: DatabaseConnection,
    geofence: GeofenceConfig,
}

impl StoreService {
    pub fn new(pool: DatabaseConnection, geofence: GeofenceConfig) -> Self {
        Self { pool, geofence }
    }

    async fn find_settings(&self) -> AppResult<Option<settings::Model>> {
        Ok(settings::Entity::find()
            .order_by_asc(settings::Column::Id)
            .one(&self.pool)
            .await?)
    }

    /// 获取门店位置配置（未配置返回 None）
    pub async fn get_settings(&self) -> AppResult<Option<StoreSettingsResponse>> {
        Ok(self
            .find_settings()
            .await?
            .map(StoreSettingsResponse::from_model))
    }

    /// 更新门店位置配置（单行，不存在则创建）
    pub async fn update_settings(
        &self,
        request: UpdateStoreSettingsRequest,
    ) -> AppResult<StoreSettingsResponse> {
        if !GeoPoint::new(request.latitude, request.longitude).is_valid() {
            return Err(AppError::ValidationError(
                "Invalid store coordinates".to_string(),
            ));
        }
        if let Some(r) = request.radius_km
            && (!r.is_finite() || r <= 0.0)
        {
            return Err(AppError::ValidationError(
                "radius_km must be greater than 0".to_string(),
            ));
        }

        let polygon = match request.polygon {
            Some(points) if !points.is_empty() => {
                if points.len() < MIN_POLYGON_POINTS {
                    return Err(AppError::ValidationError(format!(
                        "Polygon needs at least {MIN_POLYGON_POINTS} points"
                    )));
                }
                if points.iter().any(|p| !p.is_valid()) {
                    return Err(AppError::ValidationError(
                        "Invalid polygon coordinates".to_string(),
                    ));
                }
                Some(serde_json::to_string(&points)?)
            }
            _ => None,
        };

        let now = Utc::now();
        let saved = match self.find_settings().await? {
            Some(existing) => {
                let mut am = existing.into_active_model();
                am.latitude = Set(request.latitude);
                am.longitude = Set(request.longitude);
                am.radius_km = Set(request.radius_km);
                am.polygon = Set(polygon);
                am.updated_at = Set(now);
                am.update(&self.pool).await?
            }
            None => {
                settings::ActiveModel {
                    latitude: Set(request.latitude),
                    longitude: Set(request.longitude),
                    radius_km: Set(request.radius_km),
                    polygon: Set(polygon),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?
            }
        };

        log::info!(
            "Store location updated: ({}, {}) radius={:?}",
            saved.latitude,
            saved.longitude,
            saved.radius_km
        );
        Ok(StoreSettingsResponse::from_model(saved))
    }

    /// 地理围栏检查（客户端定位变化时反复调用）
    pub async fn check(&self, device: Option<GeoPoint>) -> AppResult<GeofenceCheckResponse> {
        let settings = self.get_settings().await?;
        let area = settings.as_ref().map(StoreSettingsResponse::service_area);

        let allowed =
            is_within_service_area(device, area.as_ref(), self.geofence.default_radius_km);
        let distance_km = match (device, area.as_ref()) {
            (Some(d), Some(a)) if d.is_valid() => Some(haversine_km(d, a.center)),
            _ => None,
        };

        Ok(GeofenceCheckResponse {
            allowed,
            configured: area.is_some(),
            distance_km,
        })
    }

    /// 下单前强制检查，拒绝时返回业务错误
    pub async fn ensure_within_service_area(&self, device: Option<GeoPoint>) -> AppResult<()> {
        let result = self.check(device).await?;
        if result.allowed {
            Ok(())
        } else {
            log::warn!(
                "Order blocked by geofence, distance_km={:?}",
                result.distance_km
            );
            Err(AppError::OutsideServiceArea)
        }
    }
}
