use crate::entities::Role;
use crate::middlewares::require_current_user;
use crate::models::*;
use crate::services::StoreService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/store/settings",
    tag = "store",
    responses(
        (status = 200, description = "门店位置配置，未配置时 data 为 null", body = StoreSettingsResponse)
    )
)]
pub async fn get_settings(store_service: web::Data<StoreService>) -> Result<HttpResponse> {
    match store_service.get_settings().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(ApiResponse::success(settings))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/store/settings",
    tag = "store",
    request_body = UpdateStoreSettingsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = StoreSettingsResponse),
        (status = 400, description = "坐标或多边形无效"),
        (status = 403, description = "无权限")
    )
)]
pub async fn update_settings(
    store_service: web::Data<StoreService>,
    req: HttpRequest,
    request: web::Json<UpdateStoreSettingsRequest>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match store_service.update_settings(request.into_inner()).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(ApiResponse::success(settings))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/geofence/check",
    tag = "store",
    request_body = GeofenceCheckRequest,
    responses(
        (status = 200, description = "是否在服务范围内", body = GeofenceCheckResponse)
    )
)]
pub async fn check_geofence(
    store_service: web::Data<StoreService>,
    request: web::Json<GeofenceCheckRequest>,
) -> Result<HttpResponse> {
    match store_service.check(request.location).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn store_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/store/settings")
            .route(web::get().to(get_settings))
            .route(web::put().to(update_settings)),
    )
    .route("/geofence/check", web::post().to(check_geofence));
}
