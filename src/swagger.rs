use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{OrderStatus, PaymentMethod, PaymentStatus, Role};
use crate::handlers;
use crate::models::*;
use crate::services::{OrderEvent, OrderEventKind};
use crate::utils::{GeoPoint, Navigation};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::staff_login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::logout,
        handlers::navigation::check_navigation,
        handlers::user::create_staff,
        handlers::user::list_staff,
        handlers::user::update_role,
        handlers::user::set_device_token,
        handlers::product::list_products,
        handlers::product::menu,
        handlers::product::get_product,
        handlers::product::create_product,
        handlers::product::update_product,
        handlers::product::delete_product,
        handlers::table::list_tables,
        handlers::table::create_table,
        handlers::table::delete_table,
        handlers::table::table_occupancy,
        handlers::store::get_settings,
        handlers::store::update_settings,
        handlers::store::check_geofence,
        handlers::order::create_order,
        handlers::order::list_orders,
        handlers::order::my_orders,
        handlers::order::station_orders,
        handlers::order::order_stream,
        handlers::order::get_order,
        handlers::order::advance_status,
        handlers::order::confirm_payment,
        handlers::order::reject_payment,
        handlers::order::attach_payment_proof,
        handlers::order::delete_order,
        handlers::report::sales_report,
        handlers::payment::create_payment_token,
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            Station,
            GeoPoint,
            Navigation,
            NavigationQuery,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            UserResponse,
            AuthResponse,
            CreateStaffRequest,
            UpdateRoleRequest,
            DeviceTokenRequest,
            ProductResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductQuery,
            MenuCategory,
            TableResponse,
            CreateTableRequest,
            TableOccupancyResponse,
            StoreSettingsResponse,
            UpdateStoreSettingsRequest,
            GeofenceCheckRequest,
            GeofenceCheckResponse,
            CreateOrderRequest,
            CreateOrderItemRequest,
            AttachPaymentProofRequest,
            OrderItemResponse,
            OrderResponse,
            OrderQuery,
            StationQuery,
            OrderEvent,
            OrderEventKind,
            SalesReportQuery,
            SalesReportResponse,
            StatusCount,
            ProductSales,
            PaymentItem,
            PaymentTokenRequest,
            PaymentTokenResponse,
            PaymentErrorResponse,
            PaginationParams,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and navigation API"),
        (name = "user", description = "Staff management API"),
        (name = "product", description = "Menu and product API"),
        (name = "table", description = "Table management API"),
        (name = "store", description = "Store location and geofence API"),
        (name = "order", description = "Order lifecycle API"),
        (name = "report", description = "Sales report API"),
        (name = "payment", description = "Payment token API"),
    ),
    info(
        title = "Cafe POS Backend API",
        version = "1.0.0",
        description = "Cafe self-ordering and POS REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
