//! Auth Portal - terminal front end for login, signup and the dashboard.

mod app;
mod views;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use portal_config_and_utils::{init_logging, Config, Paths, DEFAULT_LOG_LEVEL};
use tracing::error;

/// Auth Portal command-line interface.
#[derive(Parser)]
#[command(name = "auth-portal")]
#[command(about = "Sign in, sign up and manage your session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, session, logs). Defaults to ~/.auth-portal
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Also print logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "AUTH_PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "AUTH_PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Password confirmation; prompted for when omitted
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Log in with Google in the browser
    Google,
    /// Resend the signup confirmation email
    Resend {
        #[arg(long)]
        email: String,
    },
    /// Show the dashboard (requires a session)
    Dashboard,
    /// Log out
    Logout,
    /// Show the current session
    Status {
        /// Re-read the user from the provider
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => match Paths::new() {
            Ok(paths) => paths,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let config = Config::load(&paths);

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    init_logging("auth-portal", &level, &paths, cli.verbose);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Startup configuration invalid");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config, paths).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config, paths: Paths) -> anyhow::Result<bool> {
    let app = app::App::start(config, paths).await?;

    let result = match command {
        Commands::Login { email, password } => views::login::run(&app, email, password).await,
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
        } => views::signup::run(&app, name, email, password, confirm_password).await,
        Commands::Google => views::google::run(&app).await,
        Commands::Resend { email } => views::verify_email::resend(&app, email).await,
        Commands::Dashboard => Ok(views::dashboard::render(&app)),
        Commands::Logout => views::dashboard::logout(&app).await,
        Commands::Status { verify } => views::status::run(&app, verify).await,
    };

    app.shutdown().await;
    result
}
