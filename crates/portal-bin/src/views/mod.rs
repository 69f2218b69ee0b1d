//! Terminal renderings of the portal's routes.

pub mod dashboard;
pub mod google;
pub mod login;
pub mod signup;
pub mod status;
pub mod verify_email;

use crate::app::App;
use auth_context::{DASHBOARD_PATH, LOGIN_PATH};
use auth_forms::{Field, FieldErrors, FormOutcome};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

/// Read one line from stdin after printing `label`.
pub(crate) fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Use the flag value if given, otherwise ask for it.
pub(crate) fn value_or_prompt(value: Option<String>, label: &str) -> io::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Like [`value_or_prompt`], but the typed value is not echoed.
pub(crate) fn secret_or_prompt(value: Option<String>, label: &str) -> io::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => rpassword::prompt_password(format!("{label}: ")),
    }
}

/// Send the user to `url` in their browser. Returns false when the browser
/// could not be launched and the URL was printed instead.
pub(crate) fn open_in_browser(url: &str) -> bool {
    launch_with(url, |url| open::that(url))
}

fn launch_with<F>(url: &str, opener: F) -> bool
where
    F: FnOnce(&str) -> io::Result<()>,
{
    match opener(url) {
        Ok(()) => {
            debug!("Browser opened");
            println!("Opening your browser to continue...");
            true
        }
        Err(e) => {
            warn!(error = %e, "Could not open browser");
            println!("Open this URL in your browser to continue:\n\n  {url}\n");
            false
        }
    }
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Name => "Name",
        Field::Email => "Email",
        Field::Password => "Password",
        Field::ConfirmPassword => "Confirm Password",
    }
}

pub(crate) fn render_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {}: {}", field_label(field), message);
    }
}

/// Act on a form outcome. Returns whether the command succeeded.
pub(crate) fn follow(app: &App, outcome: FormOutcome) -> bool {
    match outcome {
        FormOutcome::Invalid(errors) => {
            render_field_errors(&errors);
            false
        }
        FormOutcome::Rejected { message, .. } => {
            eprintln!("Error: {message}");
            false
        }
        FormOutcome::Navigate { to } if to == DASHBOARD_PATH => dashboard::render(app),
        FormOutcome::Navigate { to } if to == LOGIN_PATH => {
            println!("Logged out.");
            true
        }
        FormOutcome::Navigate { to } => {
            println!("Continue at {to}");
            true
        }
        FormOutcome::ConfirmEmail { email } => {
            verify_email::show(&email);
            true
        }
        FormOutcome::OpenBrowser { url } => {
            open_in_browser(url.as_str());
            true
        }
    }
}
