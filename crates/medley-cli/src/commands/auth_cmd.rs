use medley_core::auth::SignUpOutcome;

use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
        } => {
            let (profile_name, profile_config) =
                resolve_profile(profile.as_deref().or(global_profile))?;
            let service = require_service(&profile_name, &profile_config)?;
            let session = service
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{profile_name}' as {email_label}");
            Ok(())
        }
        AuthCommands::Register {
            profile,
            email,
            password,
        } => {
            let (profile_name, profile_config) =
                resolve_profile(profile.as_deref().or(global_profile))?;
            let service = require_service(&profile_name, &profile_config)?;
            match service
                .sign_up(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?
            {
                SignUpOutcome::SignedIn(session) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!("Registered and signed in profile '{profile_name}' as {email_label}");
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!(
                        "Registration accepted. Confirm the address via the email you received, then run `medley auth login`."
                    );
                }
            }
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let (profile_name, profile_config) =
                resolve_profile(profile.as_deref().or(global_profile))?;
            let service = SupabaseAuthService::new_for_profile(&profile_name, &profile_config)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            let session = if let Some(service) = service {
                service
                    .restore_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?
            } else {
                load_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?
            };

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
        AuthCommands::Logout { profile } => {
            let (profile_name, profile_config) =
                resolve_profile(profile.as_deref().or(global_profile))?;
            let service = SupabaseAuthService::new_for_profile(&profile_name, &profile_config)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let stored_session = load_stored_session(&profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            if let (Some(service), Some(session)) = (service, stored_session) {
                service
                    .sign_out(&session.access_token)
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            } else {
                clear_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

fn resolve_profile(explicit: Option<&str>) -> Result<(String, CliProfile), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(explicit);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    Ok((profile_name, profile))
}

fn require_service(
    profile_name: &str,
    profile: &CliProfile,
) -> Result<SupabaseAuthService, CliError> {
    SupabaseAuthService::new_for_profile(profile_name, profile)
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or_else(|| {
            CliError::Config(format!(
                "Profile '{profile_name}' has no backend configured. Run `medley config init --profile {profile_name}` or set MEDLEY_SUPABASE_URL and MEDLEY_SUPABASE_ANON_KEY."
            ))
        })
}
