//! Quill CLI - sign in to the Quill blog and manage your account.

mod commands;
mod navigator;
mod output;

use clap::{Parser, Subcommand};
use client_config_and_utils::{init_logging_for_service, Config, Paths};

/// Quill CLI - Manage your Quill blog session and profile.
#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill CLI for authentication and profile management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write structured JSONL logs to ~/.quill/logs/client.jsonl
    #[arg(long, global = true)]
    log_file: bool,

    /// Backend API base URL. Overrides the config file.
    #[arg(long, env = "QUILL_API_BASE_URL", global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username or email and password
    Login {
        /// Username or email (prompted if omitted)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Show the signed-in user's profile
    Whoami,

    /// Re-fetch the profile of the current session
    Refresh,

    /// Manage your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update profile fields
    Update {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Change your password
    Password,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    let log_path = if cli.log_file {
        paths.ensure_dirs()?;
        Some(paths.log_file())
    } else {
        None
    };
    init_logging_for_service("cli", &config.log_level, log_path);
    tracing::debug!(api_base_url = %config.api_base_url, "Starting");

    let app = commands::App::open(&config, &paths)?;
    let format = cli.format;

    let outcome = match cli.command {
        Commands::Login { user } => commands::login(&app, user, &format).await,
        Commands::Register {
            username,
            email,
            full_name,
        } => commands::register(&app, username, email, full_name, &format).await,
        Commands::Logout => commands::logout(&app, &format).await,
        Commands::Status => commands::status(&app, &format).await,
        Commands::Whoami => commands::whoami(&app, &format).await,
        Commands::Refresh => commands::refresh(&app, &format).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Update {
                full_name,
                email,
                bio,
                avatar_url,
            } => {
                let update = blog_api::ProfileUpdate {
                    full_name,
                    email,
                    bio,
                    avatar_url,
                };
                commands::profile_update(&app, update, &format).await
            }
            ProfileCommands::Password => commands::profile_password(&app, &format).await,
        },
    };

    app.finish(&format);
    outcome
}
