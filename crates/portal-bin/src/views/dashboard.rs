use super::follow;
use crate::app::App;
use auth_context::{resolve_route, GuardDecision, DASHBOARD_PATH};
use auth_forms::DashboardView;

/// Render the protected dashboard, or explain where the guard sent us.
pub fn render(app: &App) -> bool {
    let snapshot = app.handle.snapshot();
    match resolve_route(DASHBOARD_PATH, &snapshot) {
        GuardDecision::Loading => {
            println!("Loading...");
            false
        }
        GuardDecision::Redirect { to } => {
            println!("You are not logged in. Run `auth-portal login` ({to}).");
            false
        }
        GuardDecision::Render => match DashboardView::from_snapshot(&snapshot) {
            Some(view) => {
                println!("Dashboard");
                println!("{}", view.greeting());
                true
            }
            None => false,
        },
    }
}

pub async fn logout(app: &App) -> anyhow::Result<bool> {
    match DashboardView::from_snapshot(&app.handle.snapshot()) {
        Some(view) => Ok(follow(app, view.sign_out(&app.handle).await)),
        None => {
            println!("You are not logged in.");
            Ok(true)
        }
    }
}
