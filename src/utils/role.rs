//! 角色解析与前端页面访问控制

use crate::config::StaffConfig;
use crate::entities::Role;
use serde::Serialize;
use utoipa::ToSchema;

/// 登录后角色解析
///
/// 优先级:
/// 1. 固定邮箱名单 -> admin / head
/// 2. 数据库中已存储的角色
/// 3. （可选，旧版行为）邮箱关键字推断
/// 4. 默认 user
pub fn resolve_role(email: &str, stored: Option<Role>, staff: &StaffConfig) -> Role {
    let email = email.trim().to_lowercase();

    if staff.admin_emails.iter().any(|e| *e == email) {
        return Role::Admin;
    }
    if staff.head_emails.iter().any(|e| *e == email) {
        return Role::Head;
    }
    if let Some(role) = stored {
        return role;
    }
    if staff.infer_role_from_email
        && let Some(role) = infer_role_from_email(&email)
    {
        return role;
    }
    Role::User
}

/// 按邮箱关键字推断出品岗位
///
/// NOTE: 旧前端遗留的规则，"bar" 会误匹配 barbara@ 之类的地址，
/// 仅在 `infer_role_from_email` 打开时于开户阶段使用
pub fn infer_role_from_email(email: &str) -> Option<Role> {
    let email = email.to_lowercase();
    if email.contains("kitchen") || email.contains("dapur") {
        Some(Role::Kitchen)
    } else if email.contains("barista") || email.contains("bar") {
        Some(Role::Barista)
    } else {
        None
    }
}

pub const CUSTOMER_LOGIN_ROUTE: &str = "/login";
pub const STAFF_LOGIN_ROUTE: &str = "/staff/login";

struct RouteRule {
    prefix: &'static str,
    /// 空 = 公开页面
    allowed: &'static [Role],
    login: &'static str,
}

const ROUTES: &[RouteRule] = &[
    RouteRule { prefix: "/", allowed: &[], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/menu", allowed: &[], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/login", allowed: &[], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/register", allowed: &[], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/staff/login", allowed: &[], login: STAFF_LOGIN_ROUTE },
    RouteRule { prefix: "/order", allowed: &[Role::User], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/cart", allowed: &[Role::User], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/checkout", allowed: &[Role::User], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/my-orders", allowed: &[Role::User], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/admin", allowed: &[Role::Admin, Role::Head], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/head", allowed: &[Role::Head], login: CUSTOMER_LOGIN_ROUTE },
    RouteRule { prefix: "/kitchen", allowed: &[Role::Kitchen], login: STAFF_LOGIN_ROUTE },
    RouteRule { prefix: "/barista", allowed: &[Role::Barista], login: STAFF_LOGIN_ROUTE },
];

fn matches(prefix: &str, route: &str) -> bool {
    if prefix == "/" {
        return route == "/";
    }
    route == prefix || route.starts_with(&format!("{prefix}/"))
}

fn find_rule(route: &str) -> Option<&'static RouteRule> {
    ROUTES
        .iter()
        .filter(|r| matches(r.prefix, route))
        .max_by_key(|r| r.prefix.len())
}

/// 每个角色登录后的默认页面
pub fn default_route(role: Role) -> &'static str {
    match role {
        Role::User => "/menu",
        Role::Admin => "/admin",
        Role::Head => "/head",
        Role::Kitchen => "/kitchen",
        Role::Barista => "/barista",
    }
}

pub fn can_access(role: Role, route: &str) -> bool {
    match find_rule(route) {
        Some(rule) => rule.allowed.is_empty() || rule.allowed.contains(&role),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Navigation {
    Allow,
    /// 未登录，跳转到对应登录页
    Login { redirect_to: String },
    /// 已登录但无权限，跳转到该角色默认页（不报错）
    Redirect { redirect_to: String },
}

pub fn navigate(role: Option<Role>, route: &str) -> Navigation {
    let rule = find_rule(route);

    match (role, rule) {
        (_, Some(rule)) if rule.allowed.is_empty() => Navigation::Allow,
        (None, Some(rule)) => Navigation::Login {
            redirect_to: rule.login.to_string(),
        },
        (None, None) => Navigation::Redirect {
            redirect_to: "/".to_string(),
        },
        (Some(role), Some(rule)) if rule.allowed.contains(&role) => Navigation::Allow,
        (Some(role), _) => Navigation::Redirect {
            redirect_to: default_route(role).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff() -> StaffConfig {
        StaffConfig {
            admin_emails: vec!["admin@cafe.id".into()],
            head_emails: vec!["owner@cafe.id".into()],
            infer_role_from_email: false,
        }
    }

    #[test]
    fn test_allow_list_beats_stored_role() {
        assert_eq!(
            resolve_role("Admin@Cafe.id", Some(Role::Kitchen), &staff()),
            Role::Admin
        );
        assert_eq!(resolve_role("owner@cafe.id", None, &staff()), Role::Head);
    }

    #[test]
    fn test_stored_role_beats_inference() {
        let mut cfg = staff();
        cfg.infer_role_from_email = true;
        assert_eq!(
            resolve_role("dapur1@cafe.id", Some(Role::Barista), &cfg),
            Role::Barista
        );
        assert_eq!(resolve_role("dapur1@cafe.id", None, &cfg), Role::Kitchen);
    }

    #[test]
    fn test_inference_disabled_by_default() {
        assert_eq!(resolve_role("kitchen@cafe.id", None, &staff()), Role::User);
    }

    #[test]
    fn test_infer_role_keywords() {
        assert_eq!(infer_role_from_email("kitchen.a@x.id"), Some(Role::Kitchen));
        assert_eq!(infer_role_from_email("barista@x.id"), Some(Role::Barista));
        assert_eq!(infer_role_from_email("bar2@x.id"), Some(Role::Barista));
        assert_eq!(infer_role_from_email("budi@x.id"), None);
    }

    #[test]
    fn test_kitchen_redirected_from_admin_routes() {
        assert!(!can_access(Role::Kitchen, "/admin"));
        assert!(!can_access(Role::Kitchen, "/admin/orders"));
        assert_eq!(
            navigate(Some(Role::Kitchen), "/admin/products"),
            Navigation::Redirect {
                redirect_to: "/kitchen".into()
            }
        );
    }

    #[test]
    fn test_station_roles_rejected_from_customer_tree() {
        assert!(!can_access(Role::Barista, "/checkout"));
        assert!(!can_access(Role::User, "/barista"));
        assert!(!can_access(Role::Admin, "/kitchen"));
    }

    #[test]
    fn test_unauthenticated_goes_to_matching_login() {
        assert_eq!(
            navigate(None, "/kitchen"),
            Navigation::Login {
                redirect_to: STAFF_LOGIN_ROUTE.into()
            }
        );
        assert_eq!(
            navigate(None, "/admin/reports"),
            Navigation::Login {
                redirect_to: CUSTOMER_LOGIN_ROUTE.into()
            }
        );
        assert_eq!(navigate(None, "/menu"), Navigation::Allow);
    }

    #[test]
    fn test_prefix_does_not_leak() {
        // /administrator 不应匹配 /admin
        assert_eq!(
            navigate(Some(Role::Admin), "/administrator"),
            Navigation::Redirect {
                redirect_to: "/admin".into()
            }
        );
        assert!(can_access(Role::Head, "/head/reports"));
        assert!(!can_access(Role::Admin, "/head"));
    }
}
