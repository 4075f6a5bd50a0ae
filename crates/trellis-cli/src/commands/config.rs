use std::env;

use trellis_core::config::ServiceConfig;
use trellis_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
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

    apply_profile_settings(
        &mut config,
        &profile_name,
        supabase_url,
        supabase_anon_key,
        |key| env::var(key).ok(),
    )?;
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
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `trellis auth login --email <email> --password <password>`."
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

/// Merge explicit flags, then environment, then existing values into the
/// named profile. The resulting endpoint is validated before anything is
/// written.
pub fn apply_profile_settings(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CliError> {
    let existing = config.profile(profile_name).cloned().unwrap_or_default();

    let merged_url = normalize_text_option(supabase_url)
        .or_else(|| normalize_text_option(lookup("SUPABASE_URL")))
        .or_else(|| existing.supabase_url());
    let merged_anon_key = normalize_text_option(supabase_anon_key)
        .or_else(|| normalize_text_option(lookup("SUPABASE_ANON_KEY")))
        .or_else(|| existing.supabase_anon_key());

    if let (Some(url), Some(anon_key)) = (&merged_url, &merged_anon_key) {
        ServiceConfig::new(url, anon_key)?;
    }

    let profile = config.profile_mut_or_default(profile_name);
    if merged_url.is_some() {
        profile.supabase_url = merged_url;
    }
    if merged_anon_key.is_some() {
        profile.supabase_anon_key = merged_anon_key;
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}
