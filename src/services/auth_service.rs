use crate::config::StaffConfig;
use crate::entities::{Role, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::*;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// 登录入口，两者接受的角色互不相交
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPortal {
    /// 顾客 / 管理员 / 店主
    Customer,
    /// 厨房 / 吧台
    Staff,
}

impl LoginPortal {
    pub fn accepts(&self, role: Role) -> bool {
        match self {
            LoginPortal::Customer => !role.is_station(),
            LoginPortal::Staff => role.is_station(),
        }
    }

    fn rejection(&self) -> AppError {
        match self {
            LoginPortal::Customer => AppError::AuthError(
                "Kitchen and barista accounts must sign in through the staff login".to_string(),
            ),
            LoginPortal::Staff => AppError::AuthError(
                "This account is not a kitchen or barista account".to_string(),
            ),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    staff: StaffConfig,
}

impl AuthService {
    pub fn new(pool: DatabaseConnection, jwt_service: JwtService, staff: StaffConfig) -> Self {
        Self {
            pool,
            jwt_service,
            staff,
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.pool)
            .await?)
    }

    async fn get_user_by_id(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// 名单优先于存储角色
    pub fn effective_role(&self, user: &users::Model) -> Role {
        resolve_role(&user.email, Some(user.role), &self.staff)
    }

    fn issue_tokens(&self, user: users::Model) -> AppResult<AuthResponse> {
        let role = self.effective_role(&user);
        let access_token = self
            .jwt_service
            .generate_access_token(user.id, &user.email, role)?;
        let refresh_token = self
            .jwt_service
            .generate_refresh_token(user.id, &user.email, role)?;

        let mut user_response = UserResponse::from(user);
        user_response.role = role;

        Ok(AuthResponse {
            user: user_response,
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    /// 顾客自助注册
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;
        let display_name = request.display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > 50 {
            return Err(AppError::ValidationError(
                "Display name must be 1-50 characters".to_string(),
            ));
        }

        if self.staff.is_reserved(&email) {
            log::warn!("Self-registration refused for reserved staff email {email}");
            return Err(AppError::PermissionDenied);
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let user = users::ActiveModel {
            email: Set(email),
            display_name: Set(display_name.to_string()),
            password_hash: Set(password_hash),
            role: Set(Role::User),
            device_token: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("User registered: {} ({})", user.email, user.id);
        self.issue_tokens(user)
    }

    /// 账号密码登录，角色与入口不符时拒绝
    pub async fn login(&self, portal: LoginPortal, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = normalize_email(&request.email);
        let invalid = || AppError::AuthError("Invalid email or password".to_string());

        let user = self.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(&request.password, &user.password_hash)? {
            log::info!("Failed login for {email}");
            return Err(invalid());
        }

        let role = self.effective_role(&user);
        if !portal.accepts(role) {
            log::warn!("Role {role} attempted {portal:?} login: {email}");
            return Err(portal.rejection());
        }

        self.issue_tokens(user)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        // 角色以当前记录为准，变更后刷新即生效
        let user = self.get_user_by_id(user_id).await?;
        self.issue_tokens(user)
    }

    pub async fn me(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = self.get_user_by_id(user_id).await?;
        let role = self.effective_role(&user);
        let mut response = UserResponse::from(user);
        response.role = role;
        Ok(response)
    }
}
