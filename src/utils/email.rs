use crate::error::{AppError, AppResult};
use regex::Regex;

/// 统一转小写去空格，登录与名单比对都基于此结果
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 验证邮箱格式
pub fn validate_email(email: &str) -> AppResult<()> {
    let email_regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    if email.len() > 254 || !email_regex.is_match(email) {
        return Err(AppError::ValidationError(
            "Invalid email address".to_string(),
        ));
    }

    Ok(())
}
