use crate::app::App;
use auth_forms::{ResendStatus, VerifyEmailView};

pub fn show(email: &str) {
    println!("Check your email");
    println!("We've sent a verification link to:");
    println!("  {email}");
    println!("Click the link in the email to verify your account.");
    println!("If you don't see the email, check your spam folder.");
    println!("To send it again: auth-portal resend --email {email}");
}

pub async fn resend(app: &App, email: String) -> anyhow::Result<bool> {
    let mut view = VerifyEmailView::new(email);
    let status = view.resend(&app.handle).await;
    match status {
        ResendStatus::Sent => println!("{}", status.message()),
        ResendStatus::Failed => eprintln!("{}", status.message()),
    }
    Ok(status == ResendStatus::Sent)
}
