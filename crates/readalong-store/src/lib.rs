pub mod database;
pub mod error;
pub mod row_helpers;
pub mod schema;
pub mod sessions;
pub mod stories;
pub mod users;

pub use database::Database;
pub use error::StoreError;
