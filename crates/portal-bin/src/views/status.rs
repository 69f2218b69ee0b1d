use crate::app::App;
use auth_context::AuthPhase;

pub async fn run(app: &App, verify: bool) -> anyhow::Result<bool> {
    if verify {
        if let Err(failure) = app.handle.refresh_user().await {
            eprintln!("Error: {}", failure.message);
            return Ok(false);
        }
    }

    let snapshot = app.handle.snapshot();
    match snapshot.phase() {
        AuthPhase::Authenticated => {
            println!("Status: logged in");
            if let Some(user) = &snapshot.user {
                println!("  Email: {}", user.display_email());
                if let Some(name) = user.display_name() {
                    println!("  Name:  {name}");
                }
            }
            if let Some(expires) = snapshot.session.as_ref().and_then(|s| s.expires_at_datetime()) {
                println!("  Session expires: {expires}");
            }
        }
        AuthPhase::Unauthenticated => println!("Status: not logged in"),
        AuthPhase::Initializing => println!("Status: loading"),
    }
    Ok(true)
}
