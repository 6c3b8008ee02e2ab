//! Backend entry-point: loads configuration, prepares storage and serves the
//! identity sync API.

mod server;

use std::ffi::OsString;
use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use echo_backend::config::{IdentitySettings, ServerSettings};
use echo_backend::inbound::http::health::HealthState;
use echo_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use server::{ServerConfig, create_server};

#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter([OsString::from("echo-backend")])
        .map_err(|err| io::Error::other(err.to_string()))?;
    let identity = IdentitySettings::from_env(&DefaultEnv::new())
        .map_err(|err| io::Error::other(err.to_string()))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let mut config = ServerConfig::new(bind_addr, identity);
    if let Some(database_url) = settings.database_url.as_deref() {
        if settings.skip_migrations {
            info!("skipping database migrations");
        } else {
            run_pending_migrations(database_url)
                .await
                .map_err(io::Error::other)?;
        }
        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.pool_max_size()),
        )
        .await
        .map_err(io::Error::other)?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting echo backend");
    create_server(health_state, config)?.await
}
