#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CatalogRepository, EnrollmentRepository, InMemoryRepository, ProgressRecordStore, Storage,
    StorageError,
};
