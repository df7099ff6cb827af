//! Input and storage: CSV import and the SQLite study database.

pub mod import;
pub mod store;

pub use import::{read_csv, read_csv_from, ImportedData, METADATA_COLUMNS};
pub use store::Store;
