//! Profile commands.

use super::{password_prompt, report_api_error, App};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use blog_api::ProfileUpdate;
use client_auth::{GuardDecision, RouteGuard};

/// Signed-in check shared by profile commands. Redirects (and so prints
/// the sign-in hint) when nobody is signed in.
async fn require_session(app: &App) -> bool {
    app.store.initialize().await;
    let guard = RouteGuard::new(app.store.clone(), app.navigator.clone());
    guard.check() == GuardDecision::Render
}

/// Update profile fields, then refresh the session copy.
pub async fn profile_update(app: &App, update: ProfileUpdate, format: &OutputFormat) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --full-name, --email, --bio, --avatar-url");
    }
    if !require_session(app).await {
        return Ok(());
    }

    match app.profiles.update_profile(&update).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "Profile saved, refreshing session");
            app.store.refresh().await;
            output::print_success("Profile updated", format);
        }
        Err(e) => report_api_error("Profile update failed", &e, format),
    }
    Ok(())
}

/// Change the account password.
pub async fn profile_password(app: &App, format: &OutputFormat) -> Result<()> {
    if !require_session(app).await {
        return Ok(());
    }

    let current = password_prompt("Current password")?;
    let new_password = password_prompt("New password")?;
    if password_prompt("Confirm new password")? != new_password {
        output::print_error("Passwords do not match", format);
        return Ok(());
    }

    match app.profiles.update_password(&current, &new_password).await {
        Ok(()) => output::print_success("Password changed", format),
        Err(e) => report_api_error("Password change failed", &e, format),
    }
    Ok(())
}
