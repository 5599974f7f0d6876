use crate::entities::Role;
use crate::middlewares::require_current_user;
use crate::models::*;
use crate::services::ProductService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/products",
    tag = "product",
    params(
        ("category" = Option<String>, Query, description = "按分类过滤")
    ),
    responses(
        (status = 200, description = "商品列表", body = [ProductResponse])
    )
)]
pub async fn list_products(
    product_service: web::Data<ProductService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    match product_service.list_products(&query).await {
        Ok(products) => Ok(HttpResponse::Ok().json(ApiResponse::success(products))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/menu",
    tag = "product",
    responses(
        (status = 200, description = "按分类分组的菜单", body = [MenuCategory])
    )
)]
pub async fn menu(product_service: web::Data<ProductService>) -> Result<HttpResponse> {
    match product_service.menu().await {
        Ok(menu) => Ok(HttpResponse::Ok().json(ApiResponse::success(menu))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "商品ID")
    ),
    responses(
        (status = 200, description = "商品详情", body = ProductResponse),
        (status = 404, description = "商品不存在")
    )
)]
pub async fn get_product(
    product_service: web::Data<ProductService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match product_service.get_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "product",
    request_body = CreateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = ProductResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    request: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match product_service.create_product(request.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "商品ID")
    ),
    request_body = UpdateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = ProductResponse),
        (status = 404, description = "商品不存在")
    )
)]
pub async fn update_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match product_service
        .update_product(path.into_inner(), request.into_inner())
        .await
    {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "商品ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除成功"),
        (status = 404, description = "商品不存在")
    )
)]
pub async fn delete_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_current_user(&req)?.require_any(&[Role::Admin, Role::Head])?;
    match product_service.delete_product(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Product deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(create_product))
            .route("/menu", web::get().to(menu))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}
