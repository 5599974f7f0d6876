use crate::entities::Role;
use crate::middlewares::require_current_user;
use crate::models::*;
use crate::services::TableService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/tables",
    tag = "table",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "桌台列表（含点餐二维码链接）", body = [TableResponse]),
        (status = 403, description = "无权限")
    )
)]
pub async fn list_tables(
    table_service: web::Data<TableService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match table_service.list_tables().await {
        Ok(tables) => Ok(HttpResponse::Ok().json(ApiResponse::success(tables))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tables",
    tag = "table",
    request_body = CreateTableRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = TableResponse),
        (status = 409, description = "桌号已存在")
    )
)]
pub async fn create_table(
    table_service: web::Data<TableService>,
    req: HttpRequest,
    request: web::Json<CreateTableRequest>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match table_service.create_table(request.into_inner()).await {
        Ok(table) => Ok(HttpResponse::Ok().json(ApiResponse::success(table))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/tables/{id}",
    tag = "table",
    params(
        ("id" = i64, Path, description = "桌台ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除成功"),
        (status = 409, description = "桌台有进行中的订单")
    )
)]
pub async fn delete_table(
    table_service: web::Data<TableService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match table_service.delete_table(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Table deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tables/occupancy/{label}",
    tag = "table",
    params(
        ("label" = String, Path, description = "桌号")
    ),
    responses(
        (status = 200, description = "桌台是否有进行中的订单", body = TableOccupancyResponse),
        (status = 404, description = "桌台不存在")
    )
)]
pub async fn table_occupancy(
    table_service: web::Data<TableService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match table_service.occupancy(&path).await {
        Ok(occupancy) => Ok(HttpResponse::Ok().json(ApiResponse::success(occupancy))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn table_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tables")
            .route("", web::get().to(list_tables))
            .route("", web::post().to(create_table))
            .route("/occupancy/{label}", web::get().to(table_occupancy))
            .route("/{id}", web::delete().to(delete_table)),
    );
}
