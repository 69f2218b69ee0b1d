use super::{dashboard, follow, secret_or_prompt, value_or_prompt};
use crate::app::App;
use auth_context::{resolve_route, GuardDecision, SIGNUP_PATH};
use auth_forms::SignupForm;

pub async fn run(
    app: &App,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
) -> anyhow::Result<bool> {
    if let GuardDecision::Redirect { .. } = resolve_route(SIGNUP_PATH, &app.handle.snapshot()) {
        println!("Already logged in.");
        return Ok(dashboard::render(app));
    }

    println!("Sign Up");
    let form = SignupForm {
        name: value_or_prompt(name, "Name")?,
        email: value_or_prompt(email, "Email")?,
        password: secret_or_prompt(password, "Password")?,
        confirm_password: secret_or_prompt(confirm_password, "Confirm Password")?,
    };

    let outcome = form.submit(&app.handle).await;
    Ok(follow(app, outcome))
}
