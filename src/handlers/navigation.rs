use crate::middlewares::get_current_user;
use crate::models::*;
use crate::utils::navigate;
use actix_web::{HttpRequest, HttpResponse, Result, web};

/// 前端路由守卫：匿名用户跳登录页，越权用户回到各自默认页
#[utoipa::path(
    get,
    path = "/navigation",
    tag = "auth",
    params(
        ("route" = String, Query, description = "目标前端路由")
    ),
    responses(
        (status = 200, description = "导航决策", body = crate::utils::Navigation)
    )
)]
pub async fn check_navigation(
    req: HttpRequest,
    query: web::Query<NavigationQuery>,
) -> Result<HttpResponse> {
    let role = get_current_user(&req).map(|u| u.role);
    let decision = navigate(role, &query.route);
    Ok(HttpResponse::Ok().json(ApiResponse::success(decision)))
}

pub fn navigation_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/navigation", web::get().to(check_navigation));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test};

    #[actix_web::test]
    async fn test_anonymous_staff_route_goes_to_login() {
        let app = test::init_service(App::new().configure(navigation_config)).await;
        let req = test::TestRequest::get()
            .uri("/navigation?route=/kitchen")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["decision"], "login");
    }
}
