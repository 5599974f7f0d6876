use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub staff: StaffConfig,
    #[serde(default)]
    pub geofence: GeofenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 前端点餐页地址，用于生成桌台二维码链接
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentConfig {
    pub server_key: String,
    #[serde(default)]
    pub is_production: bool,
}

/// 固定员工邮箱名单，优先级高于数据库中的角色记录
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaffConfig {
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub head_emails: Vec<String>,
    /// 旧版行为：按邮箱关键字推断 kitchen / barista，默认关闭
    #[serde(default)]
    pub infer_role_from_email: bool,
}

impl StaffConfig {
    /// 名单内的邮箱只能由开户或初始化写入，不能自助注册
    pub fn is_reserved(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails
            .iter()
            .chain(self.head_emails.iter())
            .any(|e| e.trim().to_lowercase() == email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_radius_km() -> f64 {
    0.1
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        public_base_url: get_env("PUBLIC_BASE_URL")
                            .unwrap_or_else(default_public_base_url),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    payment: PaymentConfig {
                        server_key: get_env("PAYMENT_SERVER_KEY").unwrap_or_default(),
                        is_production: get_env_parse("PAYMENT_IS_PRODUCTION", false),
                    },
                    staff: StaffConfig {
                        admin_emails: get_env("STAFF_ADMIN_EMAILS")
                            .map(|v| split_list(&v))
                            .unwrap_or_default(),
                        head_emails: get_env("STAFF_HEAD_EMAILS")
                            .map(|v| split_list(&v))
                            .unwrap_or_default(),
                        infer_role_from_email: get_env_parse("STAFF_INFER_ROLE_FROM_EMAIL", false),
                    },
                    geofence: GeofenceConfig {
                        default_radius_km: get_env_parse("GEOFENCE_DEFAULT_RADIUS_KM", 0.1f64),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            config.server.public_base_url = v;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("PAYMENT_SERVER_KEY") {
            config.payment.server_key = v;
        }
        if let Ok(v) = env::var("PAYMENT_IS_PRODUCTION")
            && let Ok(b) = v.parse()
        {
            config.payment.is_production = b;
        }
        if let Ok(v) = env::var("STAFF_ADMIN_EMAILS") {
            config.staff.admin_emails = split_list(&v);
        }
        if let Ok(v) = env::var("STAFF_HEAD_EMAILS") {
            config.staff.head_emails = split_list(&v);
        }
        if let Ok(v) = env::var("STAFF_INFER_ROLE_FROM_EMAIL")
            && let Ok(b) = v.parse()
        {
            config.staff.infer_role_from_email = b;
        }
        if let Ok(v) = env::var("GEOFENCE_DEFAULT_RADIUS_KM")
            && let Ok(r) = v.parse()
        {
            config.geofence.default_radius_km = r;
        }

        // 名单统一小写比较
        config.staff.admin_emails = config
            .staff
            .admin_emails
            .iter()
            .map(|e| e.trim().to_lowercase())
            .collect();
        config.staff.head_emails = config
            .staff
            .head_emails
            .iter()
            .map(|e| e.trim().to_lowercase())
            .collect();

        Ok(config)
    }
}
