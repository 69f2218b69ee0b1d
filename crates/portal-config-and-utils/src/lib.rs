//! Configuration, paths, and logging setup shared by the auth portal crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, ANON_KEY_ENV, DEFAULT_LOG_LEVEL, DEFAULT_OAUTH_CALLBACK_PORT,
    DEFAULT_OAUTH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, EMAIL_REDIRECT_ENV, LOG_LEVEL_ENV,
    SUPABASE_URL_ENV,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
