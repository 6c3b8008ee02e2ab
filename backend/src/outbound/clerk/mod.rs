//! Clerk backend API adapter for the
//! [`crate::domain::ports::IdentityProvider`] port.

mod dto;
mod http_client;

pub use http_client::ClerkHttpClient;
