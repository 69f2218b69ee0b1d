//! Startup and shutdown of the portal's auth stack.

use auth_context::{AuthContext, MountOptions, SessionHandle};
use auth_engine::{AuthService, SupabaseAuthClient};
use portal_config_and_utils::{Config, Paths};
use portal_storage::create_file_vault;
use std::sync::Arc;
use tracing::info;

/// Everything a view needs.
pub struct App {
    pub config: Config,
    pub handle: SessionHandle,
    context: AuthContext,
}

impl App {
    /// Build the provider client and service, and mount the auth context.
    ///
    /// Returns once the initial session state is known.
    pub async fn start(config: Config, paths: Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;

        info!(supabase_url = %config.api_base(), "Configuration loaded");

        let client = SupabaseAuthClient::from_config(&config)?;
        let vault = create_file_vault(&paths.session_file())?;
        let mut service = AuthService::new(Arc::new(client), vault);
        if let Some(url) = &config.email_redirect_url {
            service = service.with_email_redirect(url.as_str());
        }
        let service = Arc::new(service);

        let context = AuthContext::mount(service, MountOptions::default());
        let handle = context.handle();
        let snapshot = handle.wait_until_resolved().await;
        info!(phase = ?snapshot.phase(), "Auth context ready");

        Ok(Self {
            config,
            handle,
            context,
        })
    }

    pub async fn shutdown(self) {
        self.context.unmount().await;
    }
}
