//! Google sign-in through the system browser and a local callback listener.

use super::{dashboard, follow};
use crate::app::App;
use auth_engine::{map_error, AuthOperation, OAuthCallbackServer};
use auth_forms::{start_google_sign_in, FormOutcome};
use tracing::{info, warn};

pub async fn run(app: &App) -> anyhow::Result<bool> {
    let server =
        OAuthCallbackServer::new(app.config.oauth_callback_port, app.config.oauth_timeout_secs);
    // Bind first so the redirect cannot arrive before anyone is listening.
    let listener = server.bind().await?;

    match start_google_sign_in(&app.handle, &listener.callback_url()) {
        outcome @ FormOutcome::OpenBrowser { .. } => {
            follow(app, outcome);
        }
        other => return Ok(follow(app, other)),
    }

    println!("Waiting for the browser to finish...");
    let callback = listener.wait().await?;

    let code = match callback.into_code() {
        Ok(code) => code,
        Err(e) => {
            warn!(error = %e, "Google sign-in was not completed");
            let failure = map_error(AuthOperation::GoogleSignIn, &e);
            eprintln!("Error: {}", failure.message);
            return Ok(false);
        }
    };

    match app.handle.complete_oauth(&code).await {
        Ok(_) => {
            info!("Google sign-in completed");
            Ok(dashboard::render(app))
        }
        Err(failure) => {
            eprintln!("Error: {}", failure.message);
            Ok(false)
        }
    }
}
