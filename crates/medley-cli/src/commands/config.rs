use std::env;

use medley_core::config::{SUPABASE_ANON_KEY_ENV, SUPABASE_URL_ENV};

use crate::cli::ConfigCommands;
use crate::config_profiles::{
    default_config_path, is_http_url, normalize_text_option, CliProfile, CliProfilesConfig,
};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            supabase_url,
            supabase_anon_key,
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_supabase_url = normalize_text_option(supabase_url)
        .or_else(|| normalize_text_option(env::var(SUPABASE_URL_ENV).ok()))
        .or_else(|| existing_profile.supabase_url());
    let merged_supabase_anon_key = normalize_text_option(supabase_anon_key)
        .or_else(|| normalize_text_option(env::var(SUPABASE_ANON_KEY_ENV).ok()))
        .or_else(|| existing_profile.supabase_anon_key());

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = merged_supabase_url {
        profile.supabase_url = Some(value);
    }
    if let Some(value) = merged_supabase_anon_key {
        profile.supabase_anon_key = Some(value);
    }

    validate_profile_urls(profile)?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let mut missing_fields = Vec::new();
    if profile.supabase_url().is_none() {
        missing_fields.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing_fields.push("supabase_anon_key");
    }
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `medley auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let active_marker = if config.active_profile.as_deref() == Some(profile_name.as_str()) {
        " (active)"
    } else {
        ""
    };

    println!("Profile '{profile_name}'{active_marker}");
    println!("  config: {}", default_config_path().display());
    println!(
        "  supabase_url: {}",
        profile.supabase_url().as_deref().unwrap_or("(not set)")
    );
    println!(
        "  supabase_anon_key: {}",
        if profile.supabase_anon_key().is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    Ok(())
}

fn validate_profile_urls(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}
