use crate::middlewares::require_current_user;
use crate::models::*;
use crate::services::ReportService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/reports/sales",
    tag = "report",
    params(
        ("start_date" = Option<String>, Query, description = "开始日期 (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "结束日期 (YYYY-MM-DD)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "销售汇总", body = SalesReportResponse),
        (status = 403, description = "无权限")
    )
)]
pub async fn sales_report(
    report_service: web::Data<ReportService>,
    req: HttpRequest,
    query: web::Query<SalesReportQuery>,
) -> Result<HttpResponse> {
    let user = require_current_user(&req)?;
    match report_service.sales_report(&user, &query).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn report_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/reports").route("/sales", web::get().to(sales_report)));
}
