use crate::config::StaffConfig;
use crate::entities::{Role, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::middlewares::CurrentUser;
use crate::models::*;
use crate::utils::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

const MANAGER_ROLES: &[Role] = &[Role::Admin, Role::Head];
const MAX_DEVICE_TOKEN_LEN: usize = 512;

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
    staff: StaffConfig,
}

impl UserService {
    pub fn new(pool: DatabaseConnection, staff: StaffConfig) -> Self {
        Self { pool, staff }
    }

    async fn get_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn to_response(&self, user: users::Model) -> UserResponse {
        let role = resolve_role(&user.email, Some(user.role), &self.staff);
        let mut response = UserResponse::from(user);
        response.role = role;
        response
    }

    /// 只有店主可以授予或收回店主角色
    fn ensure_can_assign(actor: &CurrentUser, role: Role) -> AppResult<()> {
        if role == Role::Head && actor.role != Role::Head {
            log::warn!("User {} tried to assign head role", actor.id);
            return Err(AppError::PermissionDenied);
        }
        Ok(())
    }

    /// 开通员工账号
    ///
    /// 角色优先取请求中的显式值；未指定时仅在开启旧版推断时按邮箱关键字推断。
    pub async fn create_staff(
        &self,
        actor: &CurrentUser,
        request: CreateStaffRequest,
    ) -> AppResult<UserResponse> {
        actor.require_any(MANAGER_ROLES)?;

        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;
        let display_name = request.display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > 50 {
            return Err(AppError::ValidationError(
                "Display name must be 1-50 characters".to_string(),
            ));
        }

        let role = match request.role {
            Some(role) => role,
            None if self.staff.infer_role_from_email => {
                infer_role_from_email(&email).ok_or_else(|| {
                    AppError::ValidationError("Cannot infer staff role from email".to_string())
                })?
            }
            None => {
                return Err(AppError::ValidationError(
                    "Staff role is required".to_string(),
                ));
            }
        };
        if role == Role::User {
            return Err(AppError::ValidationError(
                "Staff role cannot be user".to_string(),
            ));
        }
        Self::ensure_can_assign(actor, role)?;

        let exists = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.pool)
            .await?
            .is_some();
        if exists {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = users::ActiveModel {
            email: Set(email),
            display_name: Set(display_name.to_string()),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(role),
            device_token: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Staff account {} created with role {} by {}",
            user.email,
            user.role,
            actor.id
        );
        Ok(self.to_response(user))
    }

    /// 员工列表（不含顾客）
    pub async fn list_staff(&self, actor: &CurrentUser) -> AppResult<Vec<UserResponse>> {
        actor.require_any(MANAGER_ROLES)?;
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Role)
            .order_by_asc(users::Column::Email)
            .all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|u| self.to_response(u))
            .filter(|u| u.role != Role::User)
            .collect())
    }

    pub async fn update_role(
        &self,
        actor: &CurrentUser,
        user_id: i64,
        request: UpdateRoleRequest,
    ) -> AppResult<UserResponse> {
        actor.require_any(MANAGER_ROLES)?;
        Self::ensure_can_assign(actor, request.role)?;

        let user = self.get_user(user_id).await?;
        Self::ensure_can_assign(actor, user.role)?;
        if user.id == actor.id {
            return Err(AppError::ValidationError(
                "Cannot change your own role".to_string(),
            ));
        }

        let previous = user.role;
        let mut am = user.into_active_model();
        am.role = Set(request.role);
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;

        log::info!(
            "Role of user {} changed {} -> {} by {}",
            updated.id,
            previous,
            updated.role,
            actor.id
        );
        Ok(self.to_response(updated))
    }

    /// 登记推送设备令牌（推送本身由外部服务完成）
    pub async fn set_device_token(
        &self,
        actor: &CurrentUser,
        request: DeviceTokenRequest,
    ) -> AppResult<UserResponse> {
        let token = request.device_token.trim();
        if token.is_empty() || token.len() > MAX_DEVICE_TOKEN_LEN {
            return Err(AppError::ValidationError(
                "Invalid device token".to_string(),
            ));
        }

        let mut am = self.get_user(actor.id).await?.into_active_model();
        am.device_token = Set(Some(token.to_string()));
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;
        Ok(self.to_response(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn staff_request(email: &str, role: Option<Role>) -> CreateStaffRequest {
        CreateStaffRequest {
            email: email.to_string(),
            password: "dapur1234".to_string(),
            display_name: "Dapur".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_staff_with_explicit_role() {
        let db = setup_test_db().await.unwrap();
        let admin = create_test_user(&db, "admin@cafe.id", Role::Admin)
            .await
            .unwrap();
        let svc = UserService::new(db, StaffConfig::default());

        let kitchen = svc
            .create_staff(
                &as_current_user(&admin),
                staff_request("chef@cafe.id", Some(Role::Kitchen)),
            )
            .await
            .unwrap();
        assert_eq!(kitchen.role, Role::Kitchen);

        // 未开启推断时必须显式指定
        let missing = svc
            .create_staff(&as_current_user(&admin), staff_request("dapur@cafe.id", None))
            .await;
        assert!(matches!(missing, Err(AppError::ValidationError(_))));

        let head = svc
            .create_staff(
                &as_current_user(&admin),
                staff_request("boss@cafe.id", Some(Role::Head)),
            )
            .await;
        assert!(matches!(head, Err(AppError::PermissionDenied)));

        let staff = svc.list_staff(&as_current_user(&admin)).await.unwrap();
        assert_eq!(staff.len(), 2);
    }

    #[tokio::test]
    async fn test_create_staff_with_legacy_inference() {
        let db = setup_test_db().await.unwrap();
        let head = create_test_user(&db, "head@cafe.id", Role::Head)
            .await
            .unwrap();
        let svc = UserService::new(
            db,
            StaffConfig {
                infer_role_from_email: true,
                ..Default::default()
            },
        );

        let barista = svc
            .create_staff(&as_current_user(&head), staff_request("barista1@cafe.id", None))
            .await
            .unwrap();
        assert_eq!(barista.role, Role::Barista);
    }

    #[tokio::test]
    async fn test_customer_cannot_manage_staff() {
        let db = setup_test_db().await.unwrap();
        let customer = create_test_user(&db, "budi@example.com", Role::User)
            .await
            .unwrap();
        let svc = UserService::new(db, StaffConfig::default());
        let result = svc
            .create_staff(
                &as_current_user(&customer),
                staff_request("x@cafe.id", Some(Role::Kitchen)),
            )
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_update_role_and_device_token() {
        let db = setup_test_db().await.unwrap();
        let admin = create_test_user(&db, "admin@cafe.id", Role::Admin)
            .await
            .unwrap();
        let user = create_test_user(&db, "sari@cafe.id", Role::User)
            .await
            .unwrap();
        let svc = UserService::new(db, StaffConfig::default());

        let updated = svc
            .update_role(
                &as_current_user(&admin),
                user.id,
                UpdateRoleRequest {
                    role: Role::Barista,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Barista);

        let own = svc
            .update_role(
                &as_current_user(&admin),
                admin.id,
                UpdateRoleRequest { role: Role::User },
            )
            .await;
        assert!(matches!(own, Err(AppError::ValidationError(_))));

        svc.set_device_token(
            &as_current_user(&user),
            DeviceTokenRequest {
                device_token: "fcm-token-123".into(),
            },
        )
        .await
        .unwrap();
        let blank = svc
            .set_device_token(
                &as_current_user(&user),
                DeviceTokenRequest {
                    device_token: " ".into(),
                },
            )
            .await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));
    }
}
