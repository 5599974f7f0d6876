pub mod order_items;
pub mod orders;
pub mod products;
pub mod store_settings;
pub mod tables;
pub mod users;

pub use order_items as order_item_entity;
pub use orders as order_entity;
pub use orders::{OrderStatus, PaymentMethod, PaymentStatus};
pub use products as product_entity;
pub use store_settings as store_settings_entity;
pub use tables as table_entity;
pub use users as user_entity;
pub use users::Role;
