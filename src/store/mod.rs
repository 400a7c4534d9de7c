pub mod csv_import;
pub mod json_store;
pub mod memory;
pub mod repository;
pub mod schema;

pub use repository::Repository;
