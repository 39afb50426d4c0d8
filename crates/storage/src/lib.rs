#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ProgressRepository, ProgressRow, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
