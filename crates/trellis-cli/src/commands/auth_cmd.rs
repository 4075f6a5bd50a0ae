use trellis_core::auth::{Credentials, LockState};
use trellis_core::config::ServiceConfig;

use crate::auth::{build_authenticator, clear_stored_session, CliAuthenticator};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let service = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .service_config()?;

    match command {
        AuthCommands::Login { email, password } => {
            let mut authenticator = authenticator_for(&profile_name, service.as_ref())?;
            let result = authenticator
                .attempt_login(&Credentials::new(email, password))
                .await;
            authenticator.shutdown().await;

            let session = result?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{profile_name}' as {email_label}");
            Ok(())
        }
        AuthCommands::Status => {
            let Some(service) = service else {
                println!("Profile '{profile_name}' is not configured.");
                return Ok(());
            };
            let mut authenticator = build_authenticator(&profile_name, &service)?;
            let session = authenticator.restore_session().await;
            print_status(&profile_name, &authenticator);
            authenticator.shutdown().await;

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (expires_at={})",
                    profile_name, email_label, session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if let Some(service) = service {
                let mut authenticator = build_authenticator(&profile_name, &service)?;
                authenticator.restore_session().await;
                let result = authenticator.logout().await;
                if let Err(error) = result {
                    tracing::warn!(%error, "Remote sign-out failed; clearing local session");
                }
            }
            clear_stored_session(&profile_name)?;
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
        AuthCommands::Watch => {
            let mut authenticator = authenticator_for(&profile_name, service.as_ref())?;
            let Some(session) = authenticator.restore_session().await else {
                return Err(CliError::NotSignedIn);
            };
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Keeping profile '{profile_name}' ({email_label}) signed in. Press Ctrl-C to stop."
            );

            tokio::signal::ctrl_c().await?;
            authenticator.shutdown().await;
            if authenticator.is_authenticated() {
                println!("Stopped; session is still valid.");
            } else {
                println!("Stopped; the session expired while watching.");
            }
            Ok(())
        }
    }
}

fn authenticator_for(
    profile_name: &str,
    service: Option<&ServiceConfig>,
) -> Result<CliAuthenticator, CliError> {
    let service = service.ok_or(CliError::NotConfigured)?;
    build_authenticator(profile_name, service)
}

fn print_status(profile_name: &str, authenticator: &CliAuthenticator) {
    let state = authenticator.guard().state();
    match state.lock() {
        LockState::Locked { .. } => {
            let remaining = authenticator.remaining_lockout();
            let minutes = u64::try_from(remaining.num_seconds())
                .unwrap_or(0)
                .div_ceil(60);
            if minutes > 0 {
                println!("Profile '{profile_name}' sign-in is locked for {minutes} more minute(s).");
            }
        }
        LockState::Unlocked if state.attempt_count() > 0 => {
            let max_attempts = authenticator.guard().policy().max_attempts;
            println!(
                "Profile '{profile_name}' has {} of {max_attempts} failed sign-in attempt(s).",
                state.attempt_count()
            );
        }
        LockState::Unlocked => {}
    }
}
