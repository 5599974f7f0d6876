use crate::entities::Role;
use crate::error::{AppError, AppResult};
use crate::utils::{Claims, JwtService};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// 鉴权后注入请求扩展的当前用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    fn from_claims(claims: Claims) -> Option<Self> {
        Some(Self {
            id: claims.sub.parse::<i64>().ok()?,
            email: claims.email,
            role: claims.role,
        })
    }

    /// 接口级角色白名单
    pub fn require_any(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            log::warn!(
                "Role {} denied (allowed: {:?}) for user {}",
                self.role,
                allowed,
                self.id
            );
            Err(AppError::PermissionDenied)
        }
    }
}

// 公开路径配置
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    /// 仅 GET 公开（菜单、桌台占用、门店位置）
    get_prefix_paths: Vec<&'static str>,
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
                "/api/payment",
                "/api/v1/navigation",
                "/api/v1/geofence/check",
            ],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/auth/"],
            get_prefix_paths: vec![
                "/api/v1/products",
                "/api/v1/tables/occupancy/",
                "/api/v1/store/settings",
            ],
            excluded_paths: vec!["/api/v1/auth/me"],
        }
    }

    fn is_public_path(&self, method: &Method, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }

        if self.exact_paths.contains(&path) {
            return true;
        }

        if method == Method::GET
            && self
                .get_prefix_paths
                .iter()
                .any(|&prefix| path.starts_with(prefix))
        {
            return true;
        }

        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

/// EventSource 无法设置请求头，事件流允许 `?access_token=` 传参
fn token_from_query(req: &ServiceRequest) -> Option<String> {
    if !req.path().ends_with("/stream") {
        return None;
    }
    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("access_token="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| token_from_query(req))
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let is_public = self.public_paths.is_public_path(req.method(), req.path());
        let token = bearer_token(&req);

        let current = token.as_deref().map(|t| {
            self.jwt_service
                .verify_access_token(t)
                .ok()
                .and_then(CurrentUser::from_claims)
        });

        match (is_public, current) {
            // 公开路径：带了有效 token 时同样注入身份（导航、下单前查询）
            (true, Some(Some(user))) => {
                req.extensions_mut().insert(user);
                Box::pin(self.service.call(req))
            }
            (true, _) => Box::pin(self.service.call(req)),
            (false, Some(Some(user))) => {
                req.extensions_mut().insert(user);
                Box::pin(self.service.call(req))
            }
            (false, Some(None)) => {
                let error = AppError::AuthError(
                    "Invalid or expired access token, please sign in again".to_string(),
                );
                Box::pin(async move { Err(error.into()) })
            }
            (false, None) => {
                let error = AppError::AuthError("Missing access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

/// 用于获取当前用户的辅助函数
pub fn get_current_user(req: &HttpRequest) -> Option<CurrentUser> {
    req.extensions().get::<CurrentUser>().cloned()
}

/// 需要登录的接口使用；中间件已拦截匿名请求，这里兜底
pub fn require_current_user(req: &HttpRequest) -> AppResult<CurrentUser> {
    get_current_user(req).ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse, web};

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match get_current_user(&req) {
            Some(u) => HttpResponse::Ok().body(u.role.to_string()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    fn jwt() -> JwtService {
        JwtService::new("test-secret", 60, 120)
    }

    #[actix_web::test]
    async fn test_protected_path_requires_token() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .route("/api/v1/orders", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/v1/orders").to_request();
        let resp = actix_test::try_call_service(&app, req).await;
        assert!(resp.is_err());

        let token = jwt()
            .generate_access_token(3, "admin@cafe.id", Role::Admin)
            .unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/api/v1/orders")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"admin"));
    }

    #[actix_web::test]
    async fn test_public_path_injects_optional_identity() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .route("/api/v1/navigation", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/navigation")
            .to_request();
        assert_eq!(
            actix_test::call_and_read_body(&app, req).await,
            web::Bytes::from_static(b"anonymous")
        );

        let token = jwt()
            .generate_access_token(9, "dapur@cafe.id", Role::Kitchen)
            .unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/api/v1/navigation")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        assert_eq!(
            actix_test::call_and_read_body(&app, req).await,
            web::Bytes::from_static(b"kitchen")
        );
    }

    #[actix_web::test]
    async fn test_stream_accepts_query_token() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .route("/api/v1/orders/stream", web::get().to(whoami)),
        )
        .await;

        let token = jwt()
            .generate_access_token(4, "bar@cafe.id", Role::Barista)
            .unwrap();
        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/orders/stream?access_token={token}"))
            .to_request();
        assert_eq!(
            actix_test::call_and_read_body(&app, req).await,
            web::Bytes::from_static(b"barista")
        );
    }

    #[test]
    fn test_public_paths_are_method_aware() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path(&Method::GET, "/api/v1/products/menu"));
        assert!(!paths.is_public_path(&Method::POST, "/api/v1/products"));
        assert!(paths.is_public_path(&Method::POST, "/api/v1/auth/login"));
        assert!(!paths.is_public_path(&Method::GET, "/api/v1/auth/me"));
        assert!(paths.is_public_path(&Method::POST, "/api/payment"));
    }

    #[test]
    fn test_require_any() {
        let user = CurrentUser {
            id: 1,
            email: "k@cafe.id".into(),
            role: Role::Kitchen,
        };
        assert!(user.require_any(&[Role::Kitchen, Role::Barista]).is_ok());
        assert!(matches!(
            user.require_any(&[Role::Admin, Role::Head]),
            Err(AppError::PermissionDenied)
        ));
    }
}
