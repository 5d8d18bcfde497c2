//! Session command handlers

use anyhow::{anyhow, Result};

use bookfolk_core::App;

use crate::editor::{prompt_text, read_password};
use crate::output::Output;

/// Sign in, or create an account with `signup`
pub async fn login(app: &mut App, email: Option<String>, signup: bool, output: &Output) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt_text("Email:")?,
    };
    let password = read_password(signup)?;

    let result = if signup {
        app.sign_up(&email, &password).await
    } else {
        app.sign_in(&email, &password).await
    };
    let user = result.map_err(|e| anyhow!(e.user_message()))?;

    if signup {
        output.success(&format!("Created account for {}", user.label()));
    } else {
        output.success(&format!("Signed in as {}", user.label()));
    }
    Ok(())
}

/// Sign out; the local session is cleared even if the provider fails
pub async fn logout(app: &mut App, output: &Output) -> Result<()> {
    let outcome = app.sign_out().await;

    match outcome.user {
        Some(user) => output.success(&format!("Signed out {}", user.label())),
        None => output.message("Not signed in."),
    }
    if let Some(err) = outcome.remote_error {
        output.warn(&format!(
            "The identity provider did not confirm sign-out: {}",
            err.user_message()
        ));
    }
    Ok(())
}

pub fn whoami(app: &App, output: &Output) -> Result<()> {
    output.print_user(app.current_user());
    Ok(())
}
