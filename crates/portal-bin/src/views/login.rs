use super::{dashboard, follow, secret_or_prompt, value_or_prompt};
use crate::app::App;
use auth_context::{resolve_route, GuardDecision, LOGIN_PATH};
use auth_forms::LoginForm;

pub async fn run(app: &App, email: Option<String>, password: Option<String>) -> anyhow::Result<bool> {
    if let GuardDecision::Redirect { .. } = resolve_route(LOGIN_PATH, &app.handle.snapshot()) {
        println!("Already logged in.");
        return Ok(dashboard::render(app));
    }

    println!("Login");
    let email = value_or_prompt(email, "Email")?;
    let password = secret_or_prompt(password, "Password")?;

    let outcome = LoginForm::new(email, password).submit(&app.handle).await;
    Ok(follow(app, outcome))
}
