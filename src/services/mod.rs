pub mod auth_service;
pub mod order_events;
pub mod order_service;
pub mod product_service;
pub mod report_service;
pub mod store_service;
pub mod table_service;
pub mod user_service;

pub use auth_service::*;
pub use order_events::*;
pub use order_service::*;
pub use product_service::*;
pub use report_service::*;
pub use store_service::*;
pub use table_service::TableService;
pub use user_service::*;
