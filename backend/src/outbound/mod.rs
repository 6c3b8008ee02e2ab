//! Driven adapters: PostgreSQL storage, an in-memory store and the Clerk
//! backend API.

pub mod clerk;
pub mod memory;
pub mod persistence;
