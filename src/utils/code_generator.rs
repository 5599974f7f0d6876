use chrono::{DateTime, Utc};
use rand::Rng;

const ORDER_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 转账识别码范围（加在小计上）
pub const UNIQUE_CODE_MIN: i64 = 1;
pub const UNIQUE_CODE_MAX: i64 = 99;

/// 生成对外展示的订单号，例如 `ORD-261018-K7Q2MX`
/// 唯一性由数据库唯一索引兜底，调用方负责冲突重试
pub fn generate_order_code(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ORDER_CODE_CHARS[rng.gen_range(0..ORDER_CODE_CHARS.len())] as char)
        .collect();
    format!("ORD-{}-{}", now.format("%y%m%d"), suffix)
}

/// 生成转账识别码
pub fn generate_unique_code() -> i64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(UNIQUE_CODE_MIN..=UNIQUE_CODE_MAX)
}
