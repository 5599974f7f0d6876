use crate::middlewares::require_current_user;
use crate::models::*;
use crate::services::UserService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/staff",
    tag = "user",
    request_body = CreateStaffRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "员工账号已开通", body = UserResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "无权限"),
        (status = 409, description = "邮箱已注册")
    )
)]
pub async fn create_staff(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateStaffRequest>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match user_service.create_staff(&user, request.into_inner()).await {
        Ok(staff) => Ok(HttpResponse::Ok().json(ApiResponse::success(staff))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/staff",
    tag = "user",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "员工列表", body = [UserResponse]),
        (status = 403, description = "无权限")
    )
)]
pub async fn list_staff(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match user_service.list_staff(&user).await {
        Ok(staff) => Ok(HttpResponse::Ok().json(ApiResponse::success(staff))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/staff/{id}/role",
    tag = "user",
    params(
        ("id" = i64, Path, description = "用户ID")
    ),
    request_body = UpdateRoleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "角色已更新", body = UserResponse),
        (status = 403, description = "无权限"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn update_role(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match user_service
        .update_role(&user, path.into_inner(), request.into_inner())
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(ApiResponse::success(updated))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/me/device-token",
    tag = "user",
    request_body = DeviceTokenRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "推送令牌已登记", body = UserResponse),
        (status = 400, description = "令牌无效")
    )
)]
pub async fn set_device_token(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<DeviceTokenRequest>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match user_service
        .set_device_token(&user, request.into_inner())
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(ApiResponse::success(updated))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/staff")
            .route("", web::post().to(create_staff))
            .route("", web::get().to(list_staff))
            .route("/{id}/role", web::put().to(update_role)),
    )
    .route("/users/me/device-token", web::put().to(set_device_token));
}
