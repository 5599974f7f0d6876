//! 地理围栏计算：门店中心点半径（haversine）或多边形边界

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// 多边形边界最少点数
pub const MIN_POLYGON_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = -6.2088)]
    pub latitude: f64,
    #[schema(example = 106.8456)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// 门店服务范围
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArea {
    pub center: GeoPoint,
    pub radius_km: Option<f64>,
    pub polygon: Vec<GeoPoint>,
}

/// 大圆距离（公里）
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// 射线法判断点是否在多边形内（经度为 x，纬度为 y）
pub fn point_in_polygon(point: GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < MIN_POLYGON_POINTS {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// 地理围栏判定
///
/// - 未配置门店位置：放行
/// - 已配置但设备没有坐标（定位失败 / 超时）：拒绝
/// - 配置了多边形：必须落在多边形内
/// - 否则距离中心点 <= 半径（未设置时使用默认半径），边界值放行
pub fn is_within_service_area(
    device: Option<GeoPoint>,
    area: Option<&ServiceArea>,
    default_radius_km: f64,
) -> bool {
    let Some(area) = area else {
        return true;
    };
    let Some(device) = device else {
        return false;
    };
    if !device.is_valid() {
        return false;
    }

    if area.polygon.len() >= MIN_POLYGON_POINTS {
        return point_in_polygon(device, &area.polygon);
    }

    let radius = area.radius_km.unwrap_or(default_radius_km);
    haversine_km(device, area.center) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GeoPoint {
        GeoPoint::new(-6.2088, 106.8456)
    }

    fn area(radius_km: Option<f64>) -> ServiceArea {
        ServiceArea {
            center: store(),
            radius_km,
            polygon: vec![],
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Jakarta -> Bandung 约 116 km
        let bandung = GeoPoint::new(-6.9175, 107.6191);
        let d = haversine_km(store(), bandung);
        assert!((d - 116.0).abs() < 3.0, "got {d}");
        assert_eq!(haversine_km(store(), store()), 0.0);
    }

    #[test]
    fn test_missing_settings_fails_open() {
        assert!(is_within_service_area(None, None, 0.1));
        assert!(is_within_service_area(
            Some(GeoPoint::new(0.0, 0.0)),
            None,
            0.1
        ));
    }

    #[test]
    fn test_missing_device_position_is_denied() {
        assert!(!is_within_service_area(None, Some(&area(Some(1.0))), 0.1));
    }

    #[test]
    fn test_radius_boundary_is_allowed() {
        let device = GeoPoint::new(-6.2097, 106.8456);
        let d = haversine_km(device, store());
        assert!(is_within_service_area(Some(device), Some(&area(Some(d))), 0.1));
        assert!(!is_within_service_area(
            Some(device),
            Some(&area(Some(d * 0.999))),
            0.1
        ));
    }

    #[test]
    fn test_default_radius_applies_when_unset() {
        // 约 55 m
        let near = GeoPoint::new(-6.2093, 106.8456);
        // 约 1.1 km
        let far = GeoPoint::new(-6.2188, 106.8456);
        assert!(is_within_service_area(Some(near), Some(&area(None)), 0.1));
        assert!(!is_within_service_area(Some(far), Some(&area(None)), 0.1));
    }

    #[test]
    fn test_polygon_takes_precedence() {
        let square = vec![
            GeoPoint::new(-6.0, 106.0),
            GeoPoint::new(-6.0, 107.0),
            GeoPoint::new(-7.0, 107.0),
            GeoPoint::new(-7.0, 106.0),
        ];
        let area = ServiceArea {
            center: store(),
            radius_km: Some(0.01),
            polygon: square,
        };
        // 在多边形内但远超半径
        assert!(is_within_service_area(
            Some(GeoPoint::new(-6.5, 106.5)),
            Some(&area),
            0.1
        ));
        assert!(!is_within_service_area(
            Some(GeoPoint::new(-5.5, 106.5)),
            Some(&area),
            0.1
        ));
    }

    #[test]
    fn test_degenerate_polygon_is_ignored() {
        assert!(!point_in_polygon(
            store(),
            &[GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]
        ));
    }
}
