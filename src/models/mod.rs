pub mod common;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod product;
pub mod report;
pub mod store;
pub mod table;
pub mod user;

pub use common::*;
pub use order::*;
pub use pagination::*;
pub use payment::*;
pub use product::*;
pub use report::*;
pub use store::*;
pub use table::*;
pub use user::*;
