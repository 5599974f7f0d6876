pub mod auth;
pub mod navigation;
pub mod order;
pub mod payment;
pub mod product;
pub mod report;
pub mod store;
pub mod table;
pub mod user;

pub use auth::auth_config;
pub use navigation::navigation_config;
pub use order::order_config;
pub use payment::payment_config;
pub use product::product_config;
pub use report::report_config;
pub use store::store_config;
pub use table::table_config;
pub use user::user_config;
