//! PostgreSQL adapter for the [`crate::domain::ports::UserRepository`] port.
//!
//! Row structs and table definitions stay private; only the repository, the
//! pool and the migration runner are exported.
//!
//! ```ignore
//! use echo_backend::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/echo")).await?;
//! let repository = DieselUserRepository::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
