//! Authentication commands.

use super::{password_prompt, report_session_error, value_or_prompt, App};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use blog_api::{RegisterRequest, User};
use client_auth::{Guarded, RouteGuard, SessionSnapshot};
use serde::Serialize;

fn display_name(user: &User) -> String {
    match user.full_name.as_deref().filter(|name| !name.is_empty()) {
        Some(full_name) => format!("{} ({})", full_name, user.username),
        None => user.username.clone(),
    }
}

/// Login with username or email and password.
pub async fn login(app: &App, user: Option<String>, format: &OutputFormat) -> Result<()> {
    app.store.initialize().await;
    if let Some(current) = app.store.current_user() {
        output::print_success(
            &format!("Already logged in as {}", display_name(&current)),
            format,
        );
        return Ok(());
    }

    let username_or_email = value_or_prompt(user, "Username or email")?;
    let password = password_prompt("Password")?;

    println!("Logging in...");
    match app.store.sign_in(&username_or_email, &password).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", display_name(&user)), format);
        }
        Err(e) => report_session_error("Login failed", &e, format),
    }
    Ok(())
}

/// Create an account and sign in.
pub async fn register(
    app: &App,
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let request = RegisterRequest {
        username: value_or_prompt(username, "Username")?,
        email: value_or_prompt(email, "Email")?,
        full_name: value_or_prompt(full_name, "Full name")?,
        password: password_prompt("Password")?,
    };
    if password_prompt("Confirm password")? != request.password {
        output::print_error("Passwords do not match", format);
        return Ok(());
    }

    println!("Creating account...");
    match app.store.register(&request).await {
        Ok(user) => output::print_success(
            &format!("Account created. Logged in as {}", display_name(&user)),
            format,
        ),
        Err(e) => report_session_error("Registration failed", &e, format),
    }
    Ok(())
}

/// Logout and clear session.
pub async fn logout(app: &App, format: &OutputFormat) -> Result<()> {
    app.store.logout().await;
    // The backend may answer 401 for a token that was already dropped locally.
    app.navigator.forget_login_redirect();
    output::print_success("Logged out successfully", format);
    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    api_base_url: &'a str,
    logged_in: bool,
    #[serde(flatten)]
    session: &'a SessionSnapshot,
}

/// Check authentication status.
pub async fn status(app: &App, format: &OutputFormat) -> Result<()> {
    app.store.initialize().await;
    let snapshot = app.store.snapshot();

    match format {
        OutputFormat::Text => {
            println!("API:      {}", app.api_base_url);
            match &snapshot.user {
                Some(user) => {
                    println!("Auth:     logged in");
                    println!("User:     {}", display_name(user));
                    println!("Email:    {}", user.email);
                }
                None => println!("Auth:     not logged in"),
            }
            if let Some(error) = &snapshot.last_error {
                println!("Detail:   {}", error);
            }
        }
        OutputFormat::Json => output::print_json(&StatusReport {
            api_base_url: &app.api_base_url,
            logged_in: snapshot.authenticated(),
            session: &snapshot,
        }),
    }
    Ok(())
}

/// Show the signed-in user's profile.
pub async fn whoami(app: &App, format: &OutputFormat) -> Result<()> {
    app.store.initialize().await;
    let guard = RouteGuard::new(app.store.clone(), app.navigator.clone());

    let rendered = guard.render(|user| {
        match format {
            OutputFormat::Text => {
                output::print_heading(&display_name(user));
                output::print_row("ID", &user.id);
                output::print_row("Username", &user.username);
                output::print_row("Email", &user.email);
                output::print_row("Bio", user.bio.as_deref().unwrap_or("-"));
                output::print_row("Avatar", user.avatar_url.as_deref().unwrap_or("-"));
            }
            OutputFormat::Json => output::print_json(user),
        }
    });

    if let Guarded::Pending = rendered {
        output::print_error("Session check did not finish", format);
    }
    Ok(())
}

/// Re-fetch the profile of the current session.
pub async fn refresh(app: &App, format: &OutputFormat) -> Result<()> {
    app.store.initialize().await;
    match app.store.refresh().await {
        Some(user) => output::print_success(
            &format!("Session refreshed for {}", display_name(&user)),
            format,
        ),
        None => {
            let detail = app.store.snapshot().last_error;
            let message = match detail {
                Some(detail) => format!("No active session ({})", detail),
                None => "No active session".to_string(),
            };
            output::print_error(&message, format);
        }
    }
    Ok(())
}
