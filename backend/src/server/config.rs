//! Inputs for building the HTTP server.

use std::net::SocketAddr;

use echo_backend::config::IdentitySettings;
use echo_backend::outbound::persistence::DbPool;

/// Everything `create_server` needs, assembled by `main`.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) identity: IdentitySettings,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, identity: IdentitySettings) -> Self {
        Self {
            bind_addr,
            identity,
            db_pool: None,
        }
    }

    /// Store users in PostgreSQL instead of process memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
