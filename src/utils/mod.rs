pub mod code_generator;
pub mod date;
pub mod email;
pub mod geo;
pub mod jwt;
pub mod password;
pub mod role;

pub use code_generator::{generate_order_code, generate_unique_code};
pub use date::parse_date_range;
pub use email::{normalize_email, validate_email};
pub use geo::*;
pub use jwt::*;
pub use password::*;
pub use role::*;
