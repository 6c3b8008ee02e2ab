//! Start-up configuration.
//!
//! Server knobs load through `ortho_config` (CLI, `ECHO_*` variables, config
//! file). Identity provider credentials are read from the process
//! environment through [`mockable::Env`] so they can be faked in tests.

mod identity;
mod server;

pub use identity::{
    API_URL_ENV, HTTP_TIMEOUT_ENV, IdentityConfigError, IdentitySettings, JWT_KEY_ENV,
    SECRET_KEY_ENV, WEBHOOK_SECRET_ENV, WEBHOOK_TOLERANCE_ENV,
};
pub use server::ServerSettings;
