pub mod manager;
pub mod sources;

pub use manager::{DatabaseError, DatabaseManager};
pub use sources::{register_standard_sources, standard_modules, OwnedRow, StandardModule, TableSource};
