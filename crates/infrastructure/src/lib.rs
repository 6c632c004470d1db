//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_application_repository;
mod in_memory_archive_writer;
mod in_memory_crosswalk_repository;
mod in_memory_grant_repository;
mod in_memory_token_store;
mod postgres_application_repository;
mod postgres_archive_writer;
mod postgres_crosswalk_repository;
mod postgres_grant_repository;
mod postgres_token_store;

pub use in_memory_application_repository::InMemoryApplicationRepository;
pub use in_memory_archive_writer::InMemoryArchiveWriter;
pub use in_memory_crosswalk_repository::InMemoryCrosswalkRepository;
pub use in_memory_grant_repository::InMemoryGrantRepository;
pub use in_memory_token_store::InMemoryTokenStore;
pub use postgres_application_repository::PostgresApplicationRepository;
pub use postgres_archive_writer::PostgresArchiveWriter;
pub use postgres_crosswalk_repository::PostgresCrosswalkRepository;
pub use postgres_grant_repository::PostgresGrantRepository;
pub use postgres_token_store::PostgresTokenStore;
